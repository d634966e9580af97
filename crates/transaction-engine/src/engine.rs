use crate::ledger::Ledger;
use crate::operation::{Operation, OperationKind, Rejection};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Aggregate outcome counters, only ever touched inside the critical section
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counters {
    pub succeeded: u64,
    pub failed: u64,
    /// Money that entered the ledger through deposits
    pub deposited: f64,
    /// Money that left the ledger through withdrawals
    pub withdrawn: f64,
}

impl Counters {
    pub const fn total(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Unlocked view of the outcome counters, for progress lines only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub succeeded: u64,
    pub failed: u64,
}

impl Progress {
    pub const fn total(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Everything guarded by the engine lock
#[derive(Debug, Clone, Default)]
pub struct BankState {
    pub ledger: Ledger,
    pub counters: Counters,
}

impl BankState {
    fn execute(&mut self, op: &Operation) -> Result<(), Rejection> {
        if !(op.amount.is_finite() && op.amount > 0.0) {
            return Err(Rejection::InvalidAmount { amount: op.amount });
        }

        match op.kind {
            OperationKind::Deposit => self.execute_deposit(op),
            OperationKind::Withdrawal => self.execute_withdrawal(op),
            OperationKind::Transfer => self.execute_transfer(op),
        }
    }

    fn execute_deposit(&mut self, op: &Operation) -> Result<(), Rejection> {
        let account = self
            .ledger
            .account_mut(op.source)
            .ok_or(Rejection::UnknownAccount { index: op.source })?;

        account.deposit(op.amount);
        self.counters.deposited += op.amount;

        Ok(())
    }

    fn execute_withdrawal(&mut self, op: &Operation) -> Result<(), Rejection> {
        let account = self
            .ledger
            .account_mut(op.source)
            .ok_or(Rejection::UnknownAccount { index: op.source })?;

        if account.balance < op.amount {
            return Err(Rejection::InsufficientFunds {
                account: op.source,
                balance: account.balance,
                amount: op.amount,
            });
        }

        account.withdraw(op.amount);
        self.counters.withdrawn += op.amount;

        Ok(())
    }

    fn execute_transfer(&mut self, op: &Operation) -> Result<(), Rejection> {
        let destination = op.destination.unwrap_or(op.source);

        if destination >= self.ledger.len() {
            return Err(Rejection::UnknownAccount { index: destination });
        }

        if destination == op.source {
            return Err(Rejection::SelfTransfer { account: op.source });
        }

        let source = self
            .ledger
            .account_mut(op.source)
            .ok_or(Rejection::UnknownAccount { index: op.source })?;

        if source.balance < op.amount {
            return Err(Rejection::InsufficientFunds {
                account: op.source,
                balance: source.balance,
                amount: op.amount,
            });
        }

        source.withdraw(op.amount);

        // Bounds were checked above
        if let Some(target) = self.ledger.account_mut(destination) {
            target.deposit(op.amount);
        }

        Ok(())
    }
}

/// Shared engine: one lock over the whole ledger and its counters.
///
/// A transfer touches two accounts picked at random, so a single coarse lock is
/// used instead of per-account locks. Every [`TransactionEngine::apply`] call runs
/// validation, mutation and the counter update as one unit.
#[derive(Debug, Default)]
pub struct TransactionEngine {
    state: Mutex<BankState>,
    /// Mirrors of the outcome counters for progress lines. Relaxed, may lag.
    advisory_succeeded: AtomicU64,
    advisory_failed: AtomicU64,
    occupants: AtomicUsize,
    peak_occupancy: AtomicUsize,
}

impl TransactionEngine {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            state: Mutex::new(BankState {
                ledger,
                counters: Counters::default(),
            }),
            ..Self::default()
        }
    }

    /// Validate and apply `op` under the engine lock.
    ///
    /// Rejections are counted as failures and returned for logging. They leave
    /// every balance untouched.
    pub fn apply(&self, op: &Operation) -> Result<(), Rejection> {
        let mut state = self.state.lock();
        let section = Occupancy::enter(self);

        let result = state.execute(op);

        match result {
            Ok(()) => state.counters.succeeded += 1,
            Err(_) => state.counters.failed += 1,
        }

        drop(section);
        drop(state);

        let mirror = if result.is_ok() {
            &self.advisory_succeeded
        } else {
            &self.advisory_failed
        };
        mirror.fetch_add(1, Ordering::Relaxed);

        result
    }

    /// Outcome counts so far, read without the lock.
    ///
    /// Advisory only: the values can trail the locked counters, the two halves
    /// are loaded separately and concurrent readers may see the same numbers.
    pub fn progress(&self) -> Progress {
        Progress {
            succeeded: self.advisory_succeeded.load(Ordering::Relaxed),
            failed: self.advisory_failed.load(Ordering::Relaxed),
        }
    }

    /// Highest number of workers ever seen inside the critical section at once
    pub fn peak_occupancy(&self) -> usize {
        self.peak_occupancy.load(Ordering::SeqCst)
    }

    pub fn counters(&self) -> Counters {
        self.state.lock().counters
    }

    pub fn balance(&self, index: usize) -> Option<f64> {
        self.state.lock().ledger.balance(index)
    }

    pub fn snapshot(&self) -> BankState {
        self.state.lock().clone()
    }

    pub fn into_parts(self) -> BankState {
        self.state.into_inner()
    }
}

/// Marks a worker as inside the critical section for the guard's lifetime
struct Occupancy<'a> {
    engine: &'a TransactionEngine,
}

impl<'a> Occupancy<'a> {
    fn enter(engine: &'a TransactionEngine) -> Self {
        let now = engine.occupants.fetch_add(1, Ordering::SeqCst) + 1;
        engine.peak_occupancy.fetch_max(now, Ordering::SeqCst);
        debug_assert_eq!(now, 1, "critical section entered twice");

        Self { engine }
    }
}

impl Drop for Occupancy<'_> {
    fn drop(&mut self) {
        self.engine.occupants.fetch_sub(1, Ordering::SeqCst);
    }
}
