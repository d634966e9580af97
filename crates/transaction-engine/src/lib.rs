pub mod engine;
pub mod ledger;
pub mod operation;
pub mod simulation;
pub mod worker;
