//! Evidence download links
//!
//! Files are never streamed through the API. The caller gets a presigned
//! URL and the access is written to the ledger.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{record_audit_log_pooled, NewAuditEvent};
use crate::error::AppError;
use crate::features::evidence::types::{EvidenceDownload, EvidenceRecord, EVIDENCE_COLUMNS};
use crate::rbac::ActorContext;
use crate::storage::{Storage, PRESIGNED_URL_TTL};

#[derive(Debug, thiserror::Error)]
pub enum DownloadEvidenceError {
    #[error("Evidence '{0}' not found")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<DownloadEvidenceError> for AppError {
    fn from(err: DownloadEvidenceError) -> Self {
        match err {
            DownloadEvidenceError::NotFound(_) => AppError::NotFound(err.to_string()),
            DownloadEvidenceError::Storage(e) => AppError::Storage(e),
            DownloadEvidenceError::Database(e) => AppError::Database(e),
        }
    }
}

#[tracing::instrument(skip(pool, storage, actor), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    storage: &Storage,
    actor: &ActorContext,
    job_id: Uuid,
    evidence_id: Uuid,
) -> Result<EvidenceDownload, DownloadEvidenceError> {
    let record = sqlx::query_as::<_, EvidenceRecord>(&format!(
        r#"
        SELECT {EVIDENCE_COLUMNS}
        FROM evidence
        WHERE id = $1 AND job_id = $2 AND organization_id = $3
        "#
    ))
    .bind(evidence_id)
    .bind(job_id)
    .bind(actor.organization_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DownloadEvidenceError::NotFound(evidence_id))?;

    let url = storage
        .generate_presigned_url(&record.storage_key, PRESIGNED_URL_TTL)
        .await
        .map_err(DownloadEvidenceError::Storage)?;

    record_audit_log_pooled(
        pool,
        NewAuditEvent::for_actor(actor, "evidence.accessed")
            .target("evidence", evidence_id)
            .job(job_id)
            .metadata(json!({
                "file_name": record.file_name,
                "sha256": record.sha256,
            }))
            .build(),
    )
    .await?;

    Ok(EvidenceDownload {
        id: record.id,
        file_name: record.file_name,
        url,
        expires_in_secs: PRESIGNED_URL_TTL.as_secs(),
    })
}
