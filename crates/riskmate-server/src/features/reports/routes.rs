//! Report API routes
//!
//! - `GET /api/v1/jobs/:id/report.pdf` - Full job report

use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Extension, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::queries::job_report_data;
use crate::api::response::attachment;
use crate::app::AppState;
use crate::audit::{record_audit_log_pooled, NewAuditEvent};
use crate::error::ApiResult;
use crate::pdf::render_job_report;
use crate::rbac::ActorContext;

pub fn reports_routes() -> Router<AppState> {
    Router::new().route("/jobs/:id/report.pdf", get(job_report))
}

#[tracing::instrument(skip(state, actor))]
async fn job_report(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Response> {
    let data = job_report_data(&state.db, &actor, job_id).await?;
    let pdf = render_job_report(&data)?;

    record_audit_log_pooled(
        &state.db,
        NewAuditEvent::for_actor(&actor, "report.generated")
            .target("job", job_id)
            .job(job_id)
            .metadata(json!({
                "report": "job",
                "size_bytes": pdf.len(),
                "controls": data.controls.len(),
                "evidence": data.evidence.len(),
                "attestations": data.attestations.len(),
            }))
            .build(),
    )
    .await?;

    tracing::info!(job_id = %job_id, size = pdf.len(), "Job report generated");

    Ok(attachment("application/pdf", &format!("job-{job_id}-report.pdf"), pdf))
}
