//! Team membership and roles

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use routes::team_routes;
pub use types::MemberRecord;
