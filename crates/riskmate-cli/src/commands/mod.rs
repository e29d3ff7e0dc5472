//! Command implementations

pub mod inspect;
pub mod verify;

use clap::ValueEnum;

/// Output format shared by every command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
