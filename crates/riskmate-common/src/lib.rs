//! Riskmate Common Library
//!
//! Shared types and utilities used by the Riskmate server and CLI.
//!
//! # Overview
//!
//! - **Error Handling**: [`RiskmateError`] and the crate [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Ledger**: hash computation and chain verification for the audit ledger
//! - **Proof packs**: manifest types written by the server and checked by the CLI
//! - **Checksums**: SHA-256 helpers for artifacts
//!
//! # Example
//!
//! ```no_run
//! use riskmate_common::ledger::{verify_chain, IntegrityStatus, LedgerRecord};
//!
//! fn check(records: &[LedgerRecord]) -> bool {
//!     verify_chain(records).status == IntegrityStatus::Verified
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod proof_pack;

pub use error::{Result, RiskmateError};
