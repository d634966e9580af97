use clap::Parser;
use std::time::Duration;
use transaction_engine::simulation::SimulationConfig;

/// Trait for reading configuration parameters
pub trait Config {
    fn accounts(&self) -> usize;
    fn workers(&self) -> usize;
    fn operations_per_worker(&self) -> usize;
    fn max_delay(&self) -> Duration;
    fn seed(&self) -> Option<u64>;
    fn progress_interval(&self) -> u64;

    fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            accounts: self.accounts(),
            workers: self.workers(),
            operations_per_worker: self.operations_per_worker(),
            max_delay: self.max_delay(),
            seed: self.seed(),
            progress_interval: self.progress_interval(),
        }
    }
}

/// CLI configuration
#[derive(Parser, Debug)]
#[command(
    name = "bank-simulator",
    about = "Concurrent bank account simulation over a shared in-memory ledger",
    version
)]
pub struct CliConfig {
    /// Number of accounts in the ledger
    #[arg(long, default_value_t = 1000)]
    accounts: usize,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 50)]
    workers: usize,

    /// Operations performed by each worker
    #[arg(long, default_value_t = 200)]
    operations: usize,

    /// Upper bound of the simulated latency before each operation, in microseconds
    #[arg(long = "max-delay-us", value_name = "MICROS", default_value_t = 2000)]
    max_delay_us: u64,

    /// Seed for reproducible balances and operations
    #[arg(long)]
    seed: Option<u64>,

    /// Completed operations between progress lines, 0 disables them
    #[arg(long, default_value_t = 100)]
    progress_interval: u64,
}

impl Config for CliConfig {
    fn accounts(&self) -> usize {
        self.accounts
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn operations_per_worker(&self) -> usize {
        self.operations
    }

    fn max_delay(&self) -> Duration {
        Duration::from_micros(self.max_delay_us)
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn progress_interval(&self) -> u64 {
        self.progress_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_simulation_defaults() {
        let config = CliConfig::try_parse_from(["bank-simulator"]).unwrap();

        assert_eq!(config.simulation(), SimulationConfig::default());
    }

    #[test]
    fn test_flags() {
        let config = CliConfig::try_parse_from([
            "bank-simulator",
            "--accounts",
            "10",
            "--workers",
            "4",
            "--operations",
            "25",
            "--max-delay-us",
            "0",
            "--seed",
            "9",
            "--progress-interval",
            "0",
        ])
        .unwrap();

        let simulation = config.simulation();
        assert_eq!(simulation.accounts, 10);
        assert_eq!(simulation.workers, 4);
        assert_eq!(simulation.operations_per_worker, 25);
        assert_eq!(simulation.max_delay, Duration::ZERO);
        assert_eq!(simulation.seed, Some(9));
        assert_eq!(simulation.progress_interval, 0);
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert!(CliConfig::try_parse_from(["bank-simulator", "--workers", "many"]).is_err());
    }
}
