mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliConfig, Config};
use std::io;
use tracing::{info, warn};
use transaction_engine::simulation::Simulation;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CliConfig::parse();

    run_simulation(&config)?;

    info!("Simulation completed successfully");

    Ok(())
}

fn run_simulation<C: Config>(config: &C) -> Result<()> {
    let settings = config.simulation();

    println!("--- BANK TRANSACTION SERVER ---");
    println!(
        "Configuration: {} workers | {} accounts",
        settings.workers, settings.accounts
    );

    let simulation = Simulation::new(settings).context("Failed to set up simulation")?;

    println!("[INFO] Ledger mounted. Accounts: {}", simulation.ledger().len());
    println!("[INFO] Starting workers... waiting for completion.");

    let report = simulation.run().context("Simulation aborted")?;

    let drift = report.drift();
    if drift.abs() > 1e-6 {
        warn!("Ledger total drifted by {drift:.6} from deposits and withdrawals");
    }

    println!();
    println!("{report}");

    Ok(())
}
