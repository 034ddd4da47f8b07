//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Storage appliance bundle analyzer
#[derive(Parser, Debug)]
#[command(name = "nxcat")]
#[command(about = "Pool health, LUN placement and slot lookups over an ingested collector bundle", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Root directory of the ingested collector bundle
    #[arg(long, short = 'p')]
    pub path: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output JSON only
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging on stderr (unless NXCAT_LOG is set)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pool capacity summaries
    Pools {
        /// Show vdev health for every pool, not only unhealthy ones
        #[arg(long)]
        all: bool,
    },

    /// Vdev health of one pool
    Health {
        pool: String,
    },

    /// Which vdev a LUN belongs to
    Resolve {
        lun: String,

        /// Volume to search; found from the LUN map when omitted
        #[arg(long)]
        volume: Option<String>,
    },

    /// Enclosure and slot of a device
    Slot {
        device: String,
    },

    /// Vendor, product and size consistency of all disks
    Disks,

    /// Bundle documents that could not be used
    Documents,
}
