//! Data gathering for generated documents

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{query_audit_logs, AuditQuery};
use crate::features::attestations::queries::list::attestations_for_job;
use crate::features::controls::queries::list::controls_for_job;
use crate::features::evidence::queries::list::evidence_for_job;
use crate::features::jobs::queries::{require_job, GetJobError};
use crate::pdf::job_report::ACTIVITY_LIMIT;
use crate::pdf::{JobReportData, ReportContext};
use crate::rbac::ActorContext;

/// Display name of an organization, falling back to its id
pub async fn organization_name(pool: &PgPool, organization_id: Uuid) -> Result<String, sqlx::Error> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM organizations WHERE id = $1")
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

    Ok(name.unwrap_or_else(|| organization_id.to_string()))
}

pub async fn report_context(pool: &PgPool, actor: &ActorContext) -> Result<ReportContext, sqlx::Error> {
    Ok(ReportContext {
        organization_name: organization_name(pool, actor.organization_id).await?,
        generated_at: Utc::now(),
        generated_by: actor.display_name().to_string(),
    })
}

#[tracing::instrument(skip(pool, actor), fields(org = %actor.organization_id))]
pub async fn job_report_data(
    pool: &PgPool,
    actor: &ActorContext,
    job_id: Uuid,
) -> Result<JobReportData, GetJobError> {
    let org = actor.organization_id;
    let job = require_job(pool, org, job_id).await?;

    let controls = controls_for_job(pool, org, job_id).await?;
    let evidence = evidence_for_job(pool, org, job_id).await?;
    let attestations = attestations_for_job(pool, org, job_id).await?;

    let activity_query = AuditQuery {
        job_id: Some(job_id),
        limit: ACTIVITY_LIMIT as i64,
        ..AuditQuery::default()
    };
    let activity = query_audit_logs(pool, org, &activity_query).await?;

    Ok(JobReportData {
        context: report_context(pool, actor).await?,
        job,
        controls,
        evidence,
        attestations,
        activity,
    })
}
