//! Upload evidence command
//!
//! The object is written to storage before the row is inserted. If the
//! insert fails the object is removed again.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::evidence::types::{EvidenceRecord, EvidenceUpload, EVIDENCE_COLUMNS};
use crate::features::jobs::queries::{fetch_job, require_open_job, JobAccessError};
use crate::rbac::ActorContext;
use crate::storage::{evidence_key, Storage};

/// Longest original file name kept on the record
pub const MAX_FILE_NAME_LEN: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum UploadEvidenceError {
    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },

    #[error(transparent)]
    Job(#[from] JobAccessError),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<UploadEvidenceError> for AppError {
    fn from(err: UploadEvidenceError) -> Self {
        match err {
            UploadEvidenceError::EmptyFile => AppError::Validation(err.to_string()),
            UploadEvidenceError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            UploadEvidenceError::Job(e) => e.into(),
            UploadEvidenceError::Storage(e) => AppError::Storage(e),
            UploadEvidenceError::Database(e) => AppError::Database(e),
        }
    }
}

/// Display name stored on the record; the object key uses a sanitized copy
fn display_file_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "upload".to_string();
    }
    trimmed.chars().take(MAX_FILE_NAME_LEN).collect()
}

#[tracing::instrument(
    skip(pool, storage, actor, upload),
    fields(org = %actor.organization_id, size = upload.data.len())
)]
pub async fn handle(
    pool: &PgPool,
    storage: &Storage,
    actor: &ActorContext,
    job_id: Uuid,
    upload: EvidenceUpload,
    max_bytes: usize,
) -> Result<EvidenceRecord, UploadEvidenceError> {
    if upload.data.is_empty() {
        return Err(UploadEvidenceError::EmptyFile);
    }
    if upload.data.len() > max_bytes {
        return Err(UploadEvidenceError::TooLarge { max_bytes });
    }

    // fail fast before writing an object nobody will reference
    match fetch_job(pool, actor.organization_id, job_id).await? {
        None => return Err(JobAccessError::NotFound(job_id).into()),
        Some(job) if job.is_archived() => return Err(JobAccessError::Archived(job_id).into()),
        Some(_) => {},
    }

    let evidence_id = Uuid::new_v4();
    let file_name = display_file_name(&upload.file_name);
    let key = evidence_key(actor.organization_id, job_id, evidence_id, &file_name);

    let stored = storage
        .upload(&key, upload.data, upload.content_type.clone())
        .await
        .map_err(UploadEvidenceError::Storage)?;

    let inserted = insert_record(
        pool,
        actor,
        job_id,
        evidence_id,
        &file_name,
        &stored,
        upload.content_type,
    )
    .await;

    match inserted {
        Ok(record) => {
            tracing::info!(evidence_id = %record.id, job_id = %job_id, "Evidence uploaded");
            Ok(record)
        },
        Err(err) => {
            if let Err(cleanup) = storage.delete(&key).await {
                tracing::warn!(
                    key = %key,
                    error = %cleanup,
                    "Failed to remove orphaned evidence object"
                );
            }
            Err(err)
        },
    }
}

async fn insert_record(
    pool: &PgPool,
    actor: &ActorContext,
    job_id: Uuid,
    evidence_id: Uuid,
    file_name: &str,
    stored: &crate::storage::UploadResult,
    content_type: Option<String>,
) -> Result<EvidenceRecord, UploadEvidenceError> {
    let mut tx = pool.begin().await?;
    require_open_job(&mut *tx, actor.organization_id, job_id).await?;

    let record = sqlx::query_as::<_, EvidenceRecord>(&format!(
        r#"
        INSERT INTO evidence (
            id, organization_id, job_id, file_name, storage_key, content_type,
            size_bytes, sha256, uploaded_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {EVIDENCE_COLUMNS}
        "#
    ))
    .bind(evidence_id)
    .bind(actor.organization_id)
    .bind(job_id)
    .bind(file_name)
    .bind(&stored.key)
    .bind(&content_type)
    .bind(stored.size)
    .bind(&stored.checksum)
    .bind(actor.user_id)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "evidence.uploaded")
            .target("evidence", evidence_id)
            .job(job_id)
            .metadata(json!({
                "file_name": record.file_name,
                "content_type": record.content_type,
                "size_bytes": record.size_bytes,
                "sha256": record.sha256,
            }))
            .build(),
    )
    .await?;

    tx.commit().await?;
    Ok(record)
}
