//! Parking lot system - console front end
//!
//! Allocates spots to arriving vehicles and prices their stay on exit.
//!
//! Module structure:
//! - `domain/` - Core types (ParkingSpot, Ticket, errors)
//! - `io/` - Console input, shell, storage and ticket ledger
//! - `services/` - Fare calculation, spot allocation, entry/exit flow
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::Parser;
use parking_system::infra::{Config, Metrics};
use parking_system::io::{ConsoleInput, InteractiveShell, MemoryStore};
use parking_system::services::{ParkingService, SystemClock};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Parking lot system - spot allocation and fare calculation
#[derive(Parser, Debug)]
#[command(name = "parking-system", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the operator prompts on stdout stay readable.
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), git_hash = %env!("GIT_HASH"), "parking-system starting");

    let args = Args::parse();
    let config = Config::load_from_path(&Config::resolve_config_path(args.config.as_deref()));

    info!(
        config_file = %config.config_file(),
        car_spots = %config.car_spots(),
        bike_spots = %config.bike_spots(),
        rates = ?config.rates(),
        free_minutes = %config.free_minutes(),
        loyalty_discount = %config.loyalty_discount(),
        ledger_enabled = %config.ledger_enabled(),
        ledger_file = %config.ledger_file(),
        "config_loaded"
    );

    let store = MemoryStore::from_config(&config).context("Failed to open ticket store")?;
    let metrics = Arc::new(Metrics::new());
    let service = ParkingService::from_config(&config, Arc::new(store), Arc::new(SystemClock), metrics);
    let shell = InteractiveShell::new(service, &config);

    let stdin = std::io::stdin();
    let mut console = ConsoleInput::new(stdin.lock(), std::io::stdout());
    shell.run(&mut console)?;

    info!("parking-system shutdown complete");
    Ok(())
}
