//! nxcat - storage appliance bundle analyzer
//!
//! Reads an ingested collector bundle and reports pool health, LUN
//! placement, slot locations and disk consistency.

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use nxcat_common::{Analyzer, NxcatConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "NXCAT_LOG";

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<NxcatConfig> {
    match &cli.config {
        Some(path) => NxcatConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(NxcatConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!("nxcat v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let analyzer = Analyzer::open(&cli.path, &config);

    match &cli.command {
        Commands::Pools { all } => commands::pools(&analyzer, *all, cli.json),
        Commands::Health { pool } => commands::health(&analyzer, pool, cli.json),
        Commands::Resolve { lun, volume } => commands::resolve(&analyzer, lun, volume.as_deref(), cli.json),
        Commands::Slot { device } => commands::slot(&analyzer, device, cli.json),
        Commands::Disks => commands::disks(&analyzer, cli.json),
        Commands::Documents => commands::documents(&analyzer, cli.json),
    }
}
