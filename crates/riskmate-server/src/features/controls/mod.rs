//! Controls (mitigations) planned and completed against job hazards

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use routes::controls_routes;
pub use types::ControlRecord;
