//! CLI interface for poly-crowd
//!
//! Provides subcommands for:
//! - `run`: Start the trading loop
//! - `scan`: Scan the current market once and report
//! - `status`: Show recent trades and aggregate stats
//! - `config`: Show the resolved configuration

mod run;
mod scan;
mod status;

pub use run::RunArgs;
pub use scan::ScanArgs;
pub use status::StatusArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "poly-crowd")]
#[command(about = "Crowd-following trading bot for Polymarket 15-minute BTC up/down markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the trading loop
    Run(RunArgs),
    /// Scan the current market once and report
    Scan(ScanArgs),
    /// Show recent trades and aggregate stats
    Status(StatusArgs),
    /// Show the resolved configuration
    Config,
}
