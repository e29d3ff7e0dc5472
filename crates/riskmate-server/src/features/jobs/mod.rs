//! Jobs: the unit of work that hazards, controls, evidence and sign-offs
//! attach to

pub mod commands;
pub mod queries;
pub mod risk;
pub mod routes;
pub mod types;

pub use routes::jobs_routes;
pub use types::{Hazard, HazardSeverity, JobRecord, JobStatus, RiskLevel};
