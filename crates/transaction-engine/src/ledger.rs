use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lowest starting balance handed to a seeded account
pub const BASE_BALANCE: f64 = 1000.0;

/// Width of the random range added on top of [`BASE_BALANCE`]
pub const BALANCE_SPREAD: u32 = 5000;

/// Single account in the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: usize,
    pub balance: f64,
}

impl Account {
    pub(crate) const fn new(id: usize, balance: f64) -> Self {
        Self { id, balance }
    }

    pub(crate) fn deposit(&mut self, amount: f64) {
        self.balance += amount;
    }

    /// Callers check the balance first; this never validates.
    pub(crate) fn withdraw(&mut self, amount: f64) {
        self.balance -= amount;
    }
}

/// Fixed-size table of accounts indexed `0..len`.
///
/// The ledger is a plain data holder. It takes no locks of its own, so every
/// mutation after initialization has to go through the engine's critical section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    accounts: Vec<Account>,
}

impl Ledger {
    /// Build `len` accounts with pseudo-random starting balances.
    ///
    /// The same seed always produces the same balances. `None` draws the seed from
    /// the operating system.
    pub fn seeded(len: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let accounts = (0..len)
            .map(|id| {
                let extra = rng.gen_range(0..BALANCE_SPREAD);
                Account::new(id, BASE_BALANCE + f64::from(extra))
            })
            .collect();

        Self { accounts }
    }

    /// Build `len` accounts that all start at `balance`
    pub fn uniform(len: usize, balance: f64) -> Self {
        Self {
            accounts: (0..len).map(|id| Account::new(id, balance)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn balance(&self, index: usize) -> Option<f64> {
        self.accounts.get(index).map(|account| account.balance)
    }

    pub(crate) fn account_mut(&mut self, index: usize) -> Option<&mut Account> {
        self.accounts.get_mut(index)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Sum of every balance
    pub fn total(&self) -> f64 {
        self.accounts.iter().map(|account| account.balance).sum()
    }
}
