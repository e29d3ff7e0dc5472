//! Riskmate CLI - Main entry point

use std::process;

use clap::Parser;
use riskmate_cli::{commands, Cli, Commands};
use riskmate_common::logging::{init_logging, LogConfig, LogOutput};
use tracing::{error, Level};

/// Exit code when a pack was read but failed verification
const EXIT_NOT_VERIFIED: i32 = 1;

/// Exit code when the pack could not be read at all
const EXIT_ERROR: i32 = 2;

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::for_binary("riskmate-cli")
        .with_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_output(LogOutput::Stderr);
    let log_config = log_config.clone().apply_env().unwrap_or(log_config);

    // the CLI works without logging
    let _guard = init_logging(&log_config).ok();

    let result = match &cli.command {
        Commands::VerifyPack { path } => commands::verify::run(path, cli.format),
        Commands::InspectPack { path } => commands::inspect::run(path, cli.format).map(|()| true),
    };

    match result {
        Ok(true) => {},
        Ok(false) => process::exit(EXIT_NOT_VERIFIED),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            process::exit(EXIT_ERROR);
        },
    }
}
