//! Feature modules implementing the Riskmate API
//!
//! Each feature is a vertical slice:
//! - `commands/` - Write operations, each in its own transaction with the
//!   ledger event it produces
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//! - `types.rs` - Records and request types
//!
//! # Features
//!
//! - **jobs**: jobs, hazards and risk scoring
//! - **controls**: mitigations planned and completed against hazards
//! - **evidence**: file uploads to object storage
//! - **attestations**: signed sign-offs
//! - **team**: members and role changes
//! - **audit_ledger**: browsing, verifying and exporting the ledger
//! - **reports**: per-job PDF report
//! - **proof_packs**: ZIP bundles for auditors

pub mod attestations;
pub mod audit_ledger;
pub mod controls;
pub mod evidence;
pub mod jobs;
pub mod proof_packs;
pub mod reports;
pub mod shared;
pub mod team;

use axum::Router;

use crate::app::AppState;
use crate::config::UploadConfig;

/// All `/api/v1` routes, without authentication layers
pub fn router(uploads: &UploadConfig) -> Router<AppState> {
    Router::new()
        .merge(jobs::jobs_routes())
        .merge(controls::controls_routes())
        .merge(evidence::evidence_routes(uploads.evidence_max_bytes))
        .merge(attestations::attestations_routes())
        .merge(reports::reports_routes())
        .merge(team::team_routes())
        .merge(audit_ledger::audit_routes())
        .merge(proof_packs::proof_packs_routes())
}
