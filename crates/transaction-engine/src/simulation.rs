use crate::engine::TransactionEngine;
use crate::ledger::{Account, Ledger};
use crate::worker::Worker;
use std::fmt;
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Fatal simulation errors. Business-rule rejections never end up here.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to spawn worker {worker}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

/// Upper bound on concurrently spawned workers
pub const MAX_WORKERS: usize = 4096;

/// Run parameters, fixed for the whole simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub accounts: usize,
    pub workers: usize,
    pub operations_per_worker: usize,
    /// Upper bound of the latency each worker sleeps before an operation
    pub max_delay: Duration,
    /// Fixed seed for the ledger and every worker generator
    pub seed: Option<u64>,
    /// Completed operations between progress lines, zero disables them
    pub progress_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accounts: 1000,
            workers: 50,
            operations_per_worker: 200,
            max_delay: Duration::from_micros(2000),
            seed: None,
            progress_interval: 100,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.accounts == 0 {
            return Err(SimulationError::InvalidConfig(
                "at least one account is required",
            ));
        }

        if self.workers == 0 {
            return Err(SimulationError::InvalidConfig(
                "at least one worker is required",
            ));
        }

        if self.workers > MAX_WORKERS {
            return Err(SimulationError::InvalidConfig(
                "too many workers, at most 4096 are supported",
            ));
        }

        let workers = self.workers as u64;
        if workers.checked_mul(self.operations_per_worker as u64).is_none() {
            return Err(SimulationError::InvalidConfig(
                "total operation count overflows",
            ));
        }

        Ok(())
    }

    /// Number of operations the run will perform in total
    pub const fn expected_operations(&self) -> u64 {
        (self.workers as u64).saturating_mul(self.operations_per_worker as u64)
    }
}

/// Final state of a finished run
#[derive(Debug, Clone)]
pub struct Report {
    pub elapsed: Duration,
    pub succeeded: u64,
    pub failed: u64,
    pub deposited: f64,
    pub withdrawn: f64,
    pub initial_total: f64,
    pub final_total: f64,
    pub accounts: Vec<Account>,
}

impl Report {
    pub const fn total(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Operations per second of wall-clock time
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.total() as f64 / seconds
        } else {
            0.0
        }
    }

    /// Difference between the final total and what deposits and withdrawals
    /// account for. Transfers are zero-sum, so only rounding shows up here.
    pub fn drift(&self) -> f64 {
        self.final_total - (self.initial_total + self.deposited - self.withdrawn)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- PERFORMANCE REPORT ---")?;
        writeln!(f, "Status:              FINISHED")?;
        writeln!(f, "Elapsed:             {:.4} seconds", self.elapsed.as_secs_f64())?;
        writeln!(f, "Total operations:    {}", self.total())?;
        writeln!(f, " > Succeeded:        {}", self.succeeded)?;
        writeln!(f, " > Failed:           {}", self.failed)?;
        writeln!(f, "Throughput:          {:.2} ops/sec", self.throughput())?;
        write!(f, "--------------------------")
    }
}

/// Owns the ledger until the run starts, then drives the workers
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    ledger: Ledger,
}

impl Simulation {
    /// Validate `config` and mount a freshly seeded ledger
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let ledger = Ledger::seeded(config.accounts, config.seed);

        Ok(Self { config, ledger })
    }

    /// Run against a prepared ledger. `config.accounts` is taken from it.
    pub fn with_ledger(
        mut config: SimulationConfig,
        ledger: Ledger,
    ) -> Result<Self, SimulationError> {
        config.accounts = ledger.len();
        config.validate()?;

        Ok(Self { config, ledger })
    }

    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Spawn every worker, wait for all of them and collect the report.
    ///
    /// Workers run inside a thread scope: when a spawn fails, the workers that
    /// did start are joined before the error is returned.
    pub fn run(self) -> Result<Report, SimulationError> {
        let Self { config, ledger } = self;
        let initial_total = ledger.total();
        let accounts = ledger.len();
        let engine = TransactionEngine::new(ledger);

        info!(
            workers = config.workers,
            accounts,
            operations_per_worker = config.operations_per_worker,
            "Starting workers"
        );

        let started = Instant::now();
        spawn_workers(&config, &engine)?;
        let elapsed = started.elapsed();

        let state = engine.into_parts();
        let counters = state.counters;

        debug!(
            succeeded = counters.succeeded,
            failed = counters.failed,
            "All workers joined"
        );

        Ok(Report {
            elapsed,
            succeeded: counters.succeeded,
            failed: counters.failed,
            deposited: counters.deposited,
            withdrawn: counters.withdrawn,
            initial_total,
            final_total: state.ledger.total(),
            accounts: state.ledger.accounts().to_vec(),
        })
    }
}

fn spawn_workers(
    config: &SimulationConfig,
    engine: &TransactionEngine,
) -> Result<(), SimulationError> {
    let accounts = config.accounts;

    thread::scope(|scope| -> Result<(), SimulationError> {
        let mut handles = Vec::new();

        for id in 0..config.workers {
            let worker = Worker::new(id, config.seed, config.operations_per_worker)
                .with_max_delay(config.max_delay)
                .with_progress_interval(config.progress_interval);

            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn_scoped(scope, move || worker.run(engine, accounts))
                .map_err(|source| SimulationError::Spawn { worker: id, source })?;

            handles.push((id, handle));
        }

        let mut first_error = None;
        for (id, handle) in handles {
            if handle.join().is_err() && first_error.is_none() {
                first_error = Some(SimulationError::WorkerPanicked { worker: id });
            }
        }

        first_error.map_or(Ok(()), Err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> SimulationConfig {
        SimulationConfig {
            accounts: 20,
            workers: 4,
            operations_per_worker: 50,
            max_delay: Duration::ZERO,
            seed: Some(1234),
            progress_interval: 0,
        }
    }

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();

        assert_eq!(config.accounts, 1000);
        assert_eq!(config.workers, 50);
        assert_eq!(config.operations_per_worker, 200);
        assert_eq!(config.max_delay, Duration::from_micros(2000));
        assert_eq!(config.expected_operations(), 10_000);
    }

    #[test]
    fn test_invalid_config() {
        let no_accounts = SimulationConfig {
            accounts: 0,
            ..quick_config()
        };
        let no_workers = SimulationConfig {
            workers: 0,
            ..quick_config()
        };

        assert!(matches!(
            Simulation::new(no_accounts),
            Err(SimulationError::InvalidConfig(_))
        ));
        assert!(matches!(
            Simulation::new(no_workers),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_worker_count_bounds() {
        let too_many = SimulationConfig {
            workers: usize::MAX,
            operations_per_worker: 0,
            ..quick_config()
        };
        let at_limit = SimulationConfig {
            workers: MAX_WORKERS,
            ..quick_config()
        };
        let overflowing = SimulationConfig {
            workers: MAX_WORKERS,
            operations_per_worker: usize::MAX,
            ..quick_config()
        };

        assert!(matches!(
            too_many.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
        assert!(at_limit.validate().is_ok());
        assert_eq!(overflowing.expected_operations(), u64::MAX);
        assert!(matches!(
            overflowing.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_panicked_worker_is_reported() {
        // An empty ledger makes account generation panic in every worker
        let config = SimulationConfig {
            accounts: 0,
            workers: 3,
            operations_per_worker: 1,
            ..quick_config()
        };
        let engine = TransactionEngine::new(Ledger::uniform(0, 0.0));

        let result = spawn_workers(&config, &engine);

        assert!(matches!(
            result,
            Err(SimulationError::WorkerPanicked { worker: 0 })
        ));
        assert_eq!(engine.counters().total(), 0);
    }

    #[test]
    fn test_run_counts_every_operation() {
        let report = Simulation::new(quick_config()).unwrap().run().unwrap();

        assert_eq!(report.total(), 200);
        assert_eq!(report.accounts.len(), 20);
    }

    #[test]
    fn test_zero_operations() {
        let config = SimulationConfig {
            operations_per_worker: 0,
            ..quick_config()
        };

        let report = Simulation::new(config).unwrap().run().unwrap();

        assert_eq!(report.total(), 0);
        assert_eq!(report.final_total, report.initial_total);
    }

    #[test]
    fn test_with_ledger_takes_account_count() {
        let simulation =
            Simulation::with_ledger(quick_config(), Ledger::uniform(3, 1000.0)).unwrap();

        assert_eq!(simulation.config().accounts, 3);
        assert_eq!(simulation.ledger().total(), 3000.0);
    }

    #[test]
    fn test_throughput_and_drift() {
        let report = Report {
            elapsed: Duration::from_secs(2),
            succeeded: 30,
            failed: 10,
            deposited: 100.0,
            withdrawn: 40.0,
            initial_total: 1000.0,
            final_total: 1060.0,
            accounts: Vec::new(),
        };

        assert_eq!(report.total(), 40);
        assert_eq!(report.throughput(), 20.0);
        assert_eq!(report.drift(), 0.0);

        let instant = Report {
            elapsed: Duration::ZERO,
            ..report
        };
        assert_eq!(instant.throughput(), 0.0);
    }

    #[test]
    fn test_report_display() {
        let report = Report {
            elapsed: Duration::from_millis(1500),
            succeeded: 2,
            failed: 1,
            deposited: 0.0,
            withdrawn: 0.0,
            initial_total: 0.0,
            final_total: 0.0,
            accounts: Vec::new(),
        };

        let text = report.to_string();

        assert!(text.contains("Status:              FINISHED"));
        assert!(text.contains("Elapsed:             1.5000 seconds"));
        assert!(text.contains("Total operations:    3"));
        assert!(text.contains(" > Succeeded:        2"));
        assert!(text.contains(" > Failed:           1"));
        assert!(text.contains("Throughput:          2.00 ops/sec"));
    }
}
