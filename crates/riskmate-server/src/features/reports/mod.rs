//! Generated job documents

pub mod queries;
pub mod routes;

pub use queries::{organization_name, report_context};
pub use routes::reports_routes;
