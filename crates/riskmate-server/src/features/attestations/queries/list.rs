//! Attestations on a job

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::features::attestations::types::{AttestationRecord, ATTESTATION_COLUMNS};
use crate::features::jobs::queries::{require_job, GetJobError};

pub async fn attestations_for_job<'e, E>(
    executor: E,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<AttestationRecord>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, AttestationRecord>(&format!(
        r#"
        SELECT {ATTESTATION_COLUMNS}
        FROM attestations
        WHERE organization_id = $1 AND job_id = $2
        ORDER BY signed_at, id
        "#
    ))
    .bind(organization_id)
    .bind(job_id)
    .fetch_all(executor)
    .await
}

/// Attestations across the organization, optionally for one job and period
pub async fn attestations_for_organization(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Option<Uuid>,
    start: Option<chrono::DateTime<chrono::Utc>>,
    end: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<Vec<AttestationRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttestationRecord>(&format!(
        r#"
        SELECT {ATTESTATION_COLUMNS}
        FROM attestations
        WHERE organization_id = $1
          AND ($2::uuid IS NULL OR job_id = $2)
          AND ($3::timestamptz IS NULL OR signed_at >= $3)
          AND ($4::timestamptz IS NULL OR signed_at <= $4)
        ORDER BY signed_at, id
        "#
    ))
    .bind(organization_id)
    .bind(job_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<AttestationRecord>, GetJobError> {
    require_job(pool, organization_id, job_id).await?;
    Ok(attestations_for_job(pool, organization_id, job_id).await?)
}
