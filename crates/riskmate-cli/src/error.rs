//! Error types for the Riskmate CLI
//!
//! Messages are shown to the user as-is, so each one says what to check.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("File operation failed: {0}. Check the path and read permissions.")]
    Io(#[from] std::io::Error),

    #[error("Not a readable ZIP archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Archive entry '{name}' is larger than {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("Proof pack has no {0}. Was it produced by Riskmate?")]
    MissingEntry(&'static str),

    #[error("{0}")]
    Pack(#[from] riskmate_common::RiskmateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
