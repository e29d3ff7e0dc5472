//! Riskmate CLI Library
//!
//! Offline tooling for proof packs produced by the Riskmate server:
//!
//! - **Verification**: recompute file hashes and the ledger hash chain
//!   (`riskmate verify-pack`)
//! - **Inspection**: summarize a pack's manifest (`riskmate inspect-pack`)

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod error;
pub mod pack;
pub mod verify;

pub use commands::OutputFormat;
pub use error::{CliError, Result};
pub use pack::ProofPack;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Riskmate - proof pack tooling
#[derive(Parser, Debug)]
#[command(name = "riskmate")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify file hashes and the ledger chain of a proof pack
    VerifyPack {
        /// Path to the proof pack ZIP
        path: PathBuf,
    },

    /// Print the manifest summary of a proof pack
    InspectPack {
        /// Path to the proof pack ZIP
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_is_global() {
        let cli = Cli::try_parse_from(["riskmate", "verify-pack", "pack.zip", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::VerifyPack { .. }));
    }
}
