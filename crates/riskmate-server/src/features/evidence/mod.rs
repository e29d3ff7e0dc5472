//! Evidence files (photos, permits, certificates) attached to jobs

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use routes::evidence_routes;
pub use types::EvidenceRecord;
