//! Evidence attached to a job

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::features::evidence::types::{EvidenceRecord, EVIDENCE_COLUMNS};
use crate::features::jobs::queries::{require_job, GetJobError};

pub async fn evidence_for_job<'e, E>(
    executor: E,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<EvidenceRecord>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, EvidenceRecord>(&format!(
        r#"
        SELECT {EVIDENCE_COLUMNS}
        FROM evidence
        WHERE organization_id = $1 AND job_id = $2
        ORDER BY created_at, id
        "#
    ))
    .bind(organization_id)
    .bind(job_id)
    .fetch_all(executor)
    .await
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<EvidenceRecord>, GetJobError> {
    require_job(pool, organization_id, job_id).await?;
    Ok(evidence_for_job(pool, organization_id, job_id).await?)
}
