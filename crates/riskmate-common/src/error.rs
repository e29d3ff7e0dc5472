//! Error types shared across Riskmate crates

use thiserror::Error;

/// Result type alias for Riskmate operations
pub type Result<T> = std::result::Result<T, RiskmateError>;

/// Main error type for Riskmate
#[derive(Error, Debug)]
pub enum RiskmateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Ledger integrity failure at seq {seq}: {reason}")]
    LedgerIntegrity { seq: i64, reason: String },

    #[error("Invalid proof pack: {0}")]
    InvalidProofPack(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl RiskmateError {
    /// Shorthand for an invalid proof pack error
    pub fn invalid_pack(message: impl Into<String>) -> Self {
        Self::InvalidProofPack(message.into())
    }
}
