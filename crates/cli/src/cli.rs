//! Command-line interface definitions using Clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

/// Rice mill stock ledger
#[derive(Debug, Parser)]
#[command(name = "ricemill")]
#[command(version, about = "Replay rice mill transactions and report stock in sacks and kilograms", long_about = None)]
pub struct Cli {
    /// Log output format (the filter comes from RUST_LOG or RICEMILL_LOG)
    #[arg(long = "log-format", value_enum, default_value_t = LogFormatArg::Json, global = true)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record every transaction of a JSON journal and print the resulting stock
    Replay {
        /// Path to a JSON array of purchase/production/sale entries
        journal: PathBuf,

        /// Stop at the first rejected transaction
        #[arg(long)]
        strict: bool,
    },

    /// Split a kilogram weight into whole sacks plus loose kilograms
    Convert {
        /// Total weight in kilograms
        #[arg(long)]
        kg: Decimal,

        /// Sack size in kilograms (defaults to RICEMILL_DEFAULT_SACK_KG)
        #[arg(long = "sack-size")]
        sack_size: Option<Decimal>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Json,
    Compact,
}

impl From<LogFormatArg> for ricemill_observability::LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => ricemill_observability::LogFormat::Json,
            LogFormatArg::Compact => ricemill_observability::LogFormat::Compact,
        }
    }
}
