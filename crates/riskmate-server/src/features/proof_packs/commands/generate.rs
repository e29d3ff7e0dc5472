//! Generate proof pack command
//!
//! The pack is rendered from a snapshot of the ledger, uploaded, and only
//! then recorded. A failed insert removes the uploaded archive.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{ledger_segment, record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::attestations::queries::list::attestations_for_organization;
use crate::features::controls::queries::list::controls_for_organization;
use crate::features::jobs::queries::{require_job, GetJobError};
use crate::features::jobs::types::{JobRecord, JOB_COLUMNS};
use crate::features::proof_packs::archive::{build_pack, BuiltPack, PackContents, PackError};
use crate::features::proof_packs::types::{ProofPackRecord, ProofPackScope, PROOF_PACK_COLUMNS};
use crate::features::reports::report_context;
use crate::rbac::{AccessDenied, ActorContext, Role};
use crate::storage::{proof_pack_key, Storage};

/// Lowest role allowed to generate or list proof packs
pub const PROOF_PACK_MIN_ROLE: Role = Role::Executive;

#[derive(Debug, thiserror::Error)]
pub enum GenerateProofPackError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    #[error("end_time cannot be before start_time")]
    InvalidPeriod,

    #[error(transparent)]
    Job(#[from] GetJobError),

    #[error("Failed to build proof pack: {0}")]
    Build(#[from] PackError),

    #[error("Proof pack worker failed: {0}")]
    Worker(String),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<GenerateProofPackError> for AppError {
    fn from(err: GenerateProofPackError) -> Self {
        match err {
            GenerateProofPackError::Forbidden(e) => e.into(),
            GenerateProofPackError::InvalidPeriod => AppError::Validation(err.to_string()),
            GenerateProofPackError::Job(e) => e.into(),
            GenerateProofPackError::Build(PackError::Render(e)) => e.into(),
            GenerateProofPackError::Build(_) | GenerateProofPackError::Worker(_) => {
                AppError::Internal(err.to_string())
            },
            GenerateProofPackError::Storage(e) => AppError::Storage(e),
            GenerateProofPackError::Database(e) => AppError::Database(e),
        }
    }
}

/// A stored pack and the archive bytes that were uploaded
#[derive(Debug)]
pub struct GeneratedProofPack {
    pub record: ProofPackRecord,
    pub archive: Vec<u8>,
}

async fn jobs_in_scope(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Option<Uuid>,
) -> Result<Vec<JobRecord>, sqlx::Error> {
    sqlx::query_as::<_, JobRecord>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs
        WHERE organization_id = $1 AND ($2::uuid IS NULL OR id = $2)
        ORDER BY created_at, id
        "#
    ))
    .bind(organization_id)
    .bind(job_id)
    .fetch_all(pool)
    .await
}

async fn gather(
    pool: &PgPool,
    actor: &ActorContext,
    scope: &ProofPackScope,
    pack_id: Uuid,
) -> Result<PackContents, GenerateProofPackError> {
    let org = actor.organization_id;
    if let Some(job_id) = scope.job_id {
        require_job(pool, org, job_id).await?;
    }

    // The ledger is always the organization's full chain for the period;
    // filtering by job would leave gaps that cannot be verified.
    let events = ledger_segment(pool, org, scope.start_time, scope.end_time).await?;
    let jobs = jobs_in_scope(pool, org, scope.job_id).await?;
    let controls = controls_for_organization(pool, org, scope.job_id).await?;
    let attestations =
        attestations_for_organization(pool, org, scope.job_id, scope.start_time, scope.end_time)
            .await?;

    Ok(PackContents {
        pack_id,
        organization_id: org,
        job_id: scope.job_id,
        generated_by: actor.user_id,
        context: report_context(pool, actor).await?,
        period_start: scope.start_time,
        period_end: scope.end_time,
        events,
        jobs,
        controls,
        attestations,
    })
}

#[tracing::instrument(skip(pool, storage, actor), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    storage: &Storage,
    actor: &ActorContext,
    scope: ProofPackScope,
) -> Result<GeneratedProofPack, GenerateProofPackError> {
    actor.require_role(PROOF_PACK_MIN_ROLE)?;
    if !scope.period_is_valid() {
        return Err(GenerateProofPackError::InvalidPeriod);
    }

    let pack_id = Uuid::new_v4();
    let contents = gather(pool, actor, &scope, pack_id).await?;

    let built = tokio::task::spawn_blocking(move || build_pack(&contents))
        .await
        .map_err(|e| GenerateProofPackError::Worker(e.to_string()))??;

    let key = proof_pack_key(actor.organization_id, pack_id);
    let stored = storage
        .upload(&key, built.archive.clone(), Some("application/zip".to_string()))
        .await
        .map_err(GenerateProofPackError::Storage)?;

    match insert_record(pool, actor, &scope, &built, &stored).await {
        Ok(record) => {
            tracing::info!(
                pack_id = %record.id,
                events = record.event_count,
                integrity = %record.ledger_integrity,
                "Proof pack generated"
            );
            Ok(GeneratedProofPack {
                record,
                archive: built.archive,
            })
        },
        Err(err) => {
            if let Err(cleanup) = storage.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned proof pack");
            }
            Err(err)
        },
    }
}

async fn insert_record(
    pool: &PgPool,
    actor: &ActorContext,
    scope: &ProofPackScope,
    built: &BuiltPack,
    stored: &crate::storage::UploadResult,
) -> Result<ProofPackRecord, GenerateProofPackError> {
    let manifest = &built.manifest;
    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, ProofPackRecord>(&format!(
        r#"
        INSERT INTO proof_packs (
            id, organization_id, job_id, generated_by, storage_key, sha256,
            size_bytes, event_count, ledger_head_hash, ledger_integrity,
            period_start, period_end
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {PROOF_PACK_COLUMNS}
        "#
    ))
    .bind(manifest.pack_id)
    .bind(actor.organization_id)
    .bind(scope.job_id)
    .bind(actor.user_id)
    .bind(&stored.key)
    .bind(&stored.checksum)
    .bind(stored.size)
    .bind(manifest.ledger.event_count as i64)
    .bind(&manifest.ledger.head_hash)
    .bind(manifest.ledger.integrity.as_str())
    .bind(scope.start_time)
    .bind(scope.end_time)
    .fetch_one(&mut *tx)
    .await?;

    let mut event = NewAuditEvent::for_actor(actor, "proof_pack.generated")
        .target("proof_pack", record.id)
        .metadata(json!({
            "sha256": record.sha256,
            "size_bytes": record.size_bytes,
            "event_count": record.event_count,
            "first_seq": manifest.ledger.first_seq,
            "last_seq": manifest.ledger.last_seq,
            "head_hash": record.ledger_head_hash,
            "integrity": record.ledger_integrity,
            "period_start": scope.start_time,
            "period_end": scope.end_time,
            "files": manifest.files.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        }));
    if let Some(job_id) = scope.job_id {
        event = event.job(job_id);
    }
    record_audit_log(&mut *tx, event.build()).await?;

    tx.commit().await?;
    Ok(record)
}
