//! HTTP surface of the audit ledger: browsing, verification and export

pub mod export;
pub mod routes;

pub use export::ExportFormat;
pub use routes::audit_routes;
