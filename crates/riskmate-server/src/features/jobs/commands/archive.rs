//! Archive job command
//!
//! Archiving is a soft delete: the row stays for reports and the ledger,
//! but the job becomes read-only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::jobs::queries::lock_job;
use crate::rbac::{AccessDenied, ActorContext, Role};

/// Lowest role allowed to archive a job
pub const ARCHIVE_MIN_ROLE: Role = Role::SafetyLead;

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveJobResponse {
    pub id: Uuid,
    pub archived_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveJobError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    #[error("Job '{0}' not found")]
    NotFound(Uuid),

    #[error("Job '{0}' is already archived")]
    AlreadyArchived(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ArchiveJobError> for AppError {
    fn from(err: ArchiveJobError) -> Self {
        match err {
            ArchiveJobError::Forbidden(denied) => denied.into(),
            ArchiveJobError::NotFound(_) => AppError::NotFound(err.to_string()),
            ArchiveJobError::AlreadyArchived(_) => AppError::Conflict(err.to_string()),
            ArchiveJobError::Database(e) => AppError::Database(e),
        }
    }
}

#[tracing::instrument(skip(pool, actor), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    job_id: Uuid,
) -> Result<ArchiveJobResponse, ArchiveJobError> {
    actor.require_role(ARCHIVE_MIN_ROLE)?;

    let mut tx = pool.begin().await?;

    let job = lock_job(&mut *tx, actor.organization_id, job_id)
        .await?
        .ok_or(ArchiveJobError::NotFound(job_id))?;

    if job.is_archived() {
        return Err(ArchiveJobError::AlreadyArchived(job_id));
    }

    let archived_at: DateTime<Utc> = sqlx::query_scalar(
        r#"
        UPDATE jobs
        SET archived_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND organization_id = $2
        RETURNING archived_at
        "#,
    )
    .bind(job_id)
    .bind(actor.organization_id)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "job.archived")
            .target("job", job_id)
            .job(job_id)
            .metadata(json!({
                "client_name": job.client_name,
                "status": job.status,
            }))
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(job_id = %job_id, "Job archived");

    Ok(ArchiveJobResponse {
        id: job_id,
        archived_at,
    })
}
