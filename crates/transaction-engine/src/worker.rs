use crate::engine::TransactionEngine;
use crate::operation::Operation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace};

/// One concurrently running unit that generates and applies operations.
///
/// Each worker owns its generator, so no random state is shared between threads
/// and a seeded run replays the same operation stream per worker.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    rng: StdRng,
    operations: usize,
    max_delay: Duration,
    progress_interval: u64,
}

/// Keeps worker streams apart from the ledger's, which draws from `seed` itself
const WORKER_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

pub(crate) const fn worker_seed(seed: u64, id: usize) -> u64 {
    (seed ^ WORKER_SEED_MIX).wrapping_add(id as u64)
}

impl Worker {
    pub fn new(id: usize, seed: Option<u64>, operations: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(worker_seed(seed, id)),
            None => StdRng::from_entropy(),
        };

        Self {
            id,
            rng,
            operations,
            max_delay: Duration::ZERO,
            progress_interval: 0,
        }
    }

    /// Upper bound of the simulated latency slept before each operation
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Log a progress line every `interval` completed operations. Zero disables it.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Run the whole loop against `engine`
    pub fn run(mut self, engine: &TransactionEngine, accounts: usize) {
        debug!(worker = self.id, operations = self.operations, "Worker started");

        for _ in 0..self.operations {
            self.pause();

            let op = Operation::random(&mut self.rng, accounts);
            self.execute(engine, &op);
        }

        debug!(worker = self.id, "Worker finished");
    }

    /// Apply one caller-built operation, bypassing generation
    pub fn execute(&self, engine: &TransactionEngine, op: &Operation) {
        match engine.apply(op) {
            Ok(()) => trace!(worker = self.id, "{op}: ok"),
            Err(rejection) => debug!(worker = self.id, "{op}: rejected, {rejection}"),
        }

        self.report_progress(engine);
    }

    fn pause(&mut self) {
        if self.max_delay.is_zero() {
            return;
        }

        let micros = u64::try_from(self.max_delay.as_micros()).unwrap_or(u64::MAX);
        thread::sleep(Duration::from_micros(self.rng.gen_range(0..micros.max(1))));
    }

    fn report_progress(&self, engine: &TransactionEngine) {
        if self.progress_interval == 0 {
            return;
        }

        // Unlocked read, several workers may print the same milestone or skip one
        let progress = engine.progress();
        let total = progress.total();
        if total % self.progress_interval == 0 {
            info!(
                worker = self.id,
                total,
                ok = progress.succeeded,
                error = progress.failed,
                "Processing"
            );
        }
    }
}
