//! Attestations: signed statements that a job's controls were verified

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use routes::attestations_routes;
pub use types::{signature_hash, AttestationRecord};
