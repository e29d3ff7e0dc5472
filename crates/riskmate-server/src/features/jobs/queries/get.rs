//! Single-job lookups scoped to an organization

use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::features::jobs::types::{JobRecord, JOB_COLUMNS};

#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Job '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<GetJobError> for AppError {
    fn from(err: GetJobError) -> Self {
        match err {
            GetJobError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetJobError::Database(e) => AppError::Database(e),
        }
    }
}

/// Fetch a job; `None` when it does not exist in this organization
pub async fn fetch_job<'e, E>(
    executor: E,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Option<JobRecord>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, JobRecord>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1 AND organization_id = $2"
    ))
    .bind(job_id)
    .bind(organization_id)
    .fetch_optional(executor)
    .await
}

/// Fetch a job with a row lock held until the transaction ends
pub async fn lock_job(
    conn: &mut PgConnection,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<Option<JobRecord>, sqlx::Error> {
    sqlx::query_as::<_, JobRecord>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1 AND organization_id = $2 FOR UPDATE"
    ))
    .bind(job_id)
    .bind(organization_id)
    .fetch_optional(conn)
    .await
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<JobRecord, GetJobError> {
    fetch_job(pool, organization_id, job_id)
        .await?
        .ok_or(GetJobError::NotFound(job_id))
}

/// Why a child record cannot be attached to a job
#[derive(Debug, thiserror::Error)]
pub enum JobAccessError {
    #[error("Job '{0}' not found")]
    NotFound(Uuid),

    #[error("Job '{0}' is archived and can no longer be changed")]
    Archived(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<JobAccessError> for AppError {
    fn from(err: JobAccessError) -> Self {
        match err {
            JobAccessError::NotFound(_) => AppError::NotFound(err.to_string()),
            JobAccessError::Archived(_) => AppError::Conflict(err.to_string()),
            JobAccessError::Database(e) => AppError::Database(e),
        }
    }
}

/// Lock a job that new controls, evidence or attestations will be added to
pub async fn require_open_job(
    conn: &mut PgConnection,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<JobRecord, JobAccessError> {
    let job = lock_job(conn, organization_id, job_id)
        .await?
        .ok_or(JobAccessError::NotFound(job_id))?;

    if job.is_archived() {
        return Err(JobAccessError::Archived(job_id));
    }
    Ok(job)
}

/// Check a job exists before listing its children
pub async fn require_job(
    pool: &PgPool,
    organization_id: Uuid,
    job_id: Uuid,
) -> Result<JobRecord, GetJobError> {
    handle(pool, organization_id, job_id).await
}
