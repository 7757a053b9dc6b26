//! CLI argument definitions and command handlers.

pub mod weather;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Conversational travel/weather advisor service.
#[derive(Debug, Parser)]
#[command(name = "tenki", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to config.toml (defaults to TENKI_CONFIG or ./config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Export spans via OpenTelemetry (stdout exporter)
        #[arg(long)]
        otel: bool,
    },

    /// Look up current weather for a city from the terminal
    Weather {
        /// City query (e.g. "Kyoto, Japan")
        city: String,

        /// Response locale ("ja" or "en")
        #[arg(long, default_value = "ja")]
        lang: String,

        /// Forecast days (1 or 5)
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
}
