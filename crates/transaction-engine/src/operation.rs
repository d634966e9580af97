use rand::Rng;
use std::fmt;
use thiserror::Error;

/// Smallest amount a generated operation moves
pub const MIN_AMOUNT: u32 = 10;

/// Width of the random range added on top of [`MIN_AMOUNT`]
pub const AMOUNT_SPREAD: u32 = 500;

/// Operation type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
        };

        f.write_str(name)
    }
}

/// One request against the ledger. Lives for a single critical section.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub source: usize,
    /// Only set for transfers
    pub destination: Option<usize>,
    pub amount: f64,
}

impl Operation {
    pub const fn deposit(account: usize, amount: f64) -> Self {
        Self {
            kind: OperationKind::Deposit,
            source: account,
            destination: None,
            amount,
        }
    }

    pub const fn withdrawal(account: usize, amount: f64) -> Self {
        Self {
            kind: OperationKind::Withdrawal,
            source: account,
            destination: None,
            amount,
        }
    }

    pub const fn transfer(source: usize, destination: usize, amount: f64) -> Self {
        Self {
            kind: OperationKind::Transfer,
            source,
            destination: Some(destination),
            amount,
        }
    }

    /// Draw a uniformly random operation over a ledger of `accounts` entries.
    ///
    /// `accounts` must be non-zero.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, accounts: usize) -> Self {
        let source = rng.gen_range(0..accounts);
        let amount = f64::from(MIN_AMOUNT + rng.gen_range(0..AMOUNT_SPREAD));

        match rng.gen_range(0..3u8) {
            0 => Self::deposit(source, amount),
            1 => Self::withdrawal(source, amount),
            _ => Self::transfer(source, rng.gen_range(0..accounts), amount),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.destination {
            Some(destination) => write!(
                f,
                "{} {:.2} from #{} to #{}",
                self.kind, self.amount, self.source, destination
            ),
            None => write!(f, "{} {:.2} on #{}", self.kind, self.amount, self.source),
        }
    }
}

/// Business-rule rejection. Counted as a failure, never propagated as a hard error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("insufficient funds in account {account}: balance {balance:.2}, requested {amount:.2}")]
    InsufficientFunds {
        account: usize,
        balance: f64,
        amount: f64,
    },

    #[error("transfer from account {account} to itself")]
    SelfTransfer { account: usize },

    #[error("account {index} does not exist")]
    UnknownAccount { index: usize },

    #[error("amount {amount} is not a positive finite number")]
    InvalidAmount { amount: f64 },
}
