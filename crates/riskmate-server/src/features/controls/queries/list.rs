//! Controls attached to a job

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::features::controls::types::{ControlRecord, CONTROL_COLUMNS};
use crate::features::jobs::queries::{require_job, GetJobError};

/// Controls for one job in creation order
pub async fn controls_for_job<'e, E>(
    executor: E,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<ControlRecord>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ControlRecord>(&format!(
        r#"
        SELECT {CONTROL_COLUMNS}
        FROM controls
        WHERE organization_id = $1 AND job_id = $2
        ORDER BY created_at, id
        "#
    ))
    .bind(organization_id)
    .bind(job_id)
    .fetch_all(executor)
    .await
}

/// Controls for every job in the organization, or one job when given
pub async fn controls_for_organization(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Option<Uuid>,
) -> Result<Vec<ControlRecord>, sqlx::Error> {
    sqlx::query_as::<_, ControlRecord>(&format!(
        r#"
        SELECT {CONTROL_COLUMNS}
        FROM controls
        WHERE organization_id = $1 AND ($2::uuid IS NULL OR job_id = $2)
        ORDER BY job_id, created_at, id
        "#
    ))
    .bind(organization_id)
    .bind(job_id)
    .fetch_all(pool)
    .await
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<ControlRecord>, GetJobError> {
    require_job(pool, organization_id, job_id).await?;
    Ok(controls_for_job(pool, organization_id, job_id).await?)
}
