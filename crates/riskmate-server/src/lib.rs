//! Riskmate Server Library
//!
//! HTTP API for job safety compliance: jobs and their hazards, controls,
//! evidence and sign-offs, all recorded in a tamper-evident audit ledger
//! from which reports and proof packs are generated.
//!
//! # Modules
//!
//! - [`audit`]: append-only hash-chained ledger
//! - [`rbac`]: role hierarchy and the read-only write guard
//! - [`auth`]: bearer-token authentication
//! - [`features`]: vertical feature slices (commands, queries, routes)
//! - [`pdf`]: report rendering
//! - [`storage`]: S3-compatible object storage

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod api;
pub mod app;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod pdf;
pub mod rbac;
pub mod storage;

pub use app::{create_router, AppState};
pub use config::Config;
pub use error::{ApiResult, AppError};
