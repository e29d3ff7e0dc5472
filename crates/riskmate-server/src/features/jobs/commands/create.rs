//! Create job command
//!
//! Inserts a job with its hazards, scores it and records `job.created` in
//! the same transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{types::Json, PgPool};

use super::{
    date_range_is_valid, normalize_hazards, HazardValidationError, MAX_DESCRIPTION_LEN,
    MAX_TEXT_FIELD_LEN,
};
use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::jobs::risk::assess;
use crate::features::jobs::types::{Hazard, JobRecord, JobStatus, JOB_COLUMNS};
use crate::features::shared::{
    normalize_optional, validate_optional_text, validate_text, TextValidationError,
};
use crate::rbac::ActorContext;

/// Command to create a job
///
/// # Examples
///
/// ```rust,ignore
/// let command = CreateJobCommand {
///     client_name: "Harbor Logistics".to_string(),
///     job_type: "Roof repair".to_string(),
///     location: "Pier 4, Warehouse B".to_string(),
///     description: None,
///     status: None,
///     hazards: vec![Hazard {
///         code: "WAH".into(),
///         name: "Working at height".into(),
///         severity: HazardSeverity::High,
///     }],
///     start_date: None,
///     end_date: None,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobCommand {
    pub client_name: String,
    pub job_type: String,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to `planned`
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateJobError {
    #[error(transparent)]
    Field(#[from] TextValidationError),

    #[error(transparent)]
    Hazard(#[from] HazardValidationError),

    #[error("End date cannot be before the start date")]
    InvalidDateRange,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CreateJobError> for AppError {
    fn from(err: CreateJobError) -> Self {
        match err {
            CreateJobError::Database(e) => AppError::Database(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl CreateJobCommand {
    /// Trim text fields and normalize hazard codes, then validate
    pub fn normalize(mut self) -> Result<Self, CreateJobError> {
        self.client_name = self.client_name.trim().to_string();
        self.job_type = self.job_type.trim().to_string();
        self.location = self.location.trim().to_string();
        self.description = normalize_optional(self.description);

        validate_text("client_name", &self.client_name, MAX_TEXT_FIELD_LEN)?;
        validate_text("job_type", &self.job_type, MAX_TEXT_FIELD_LEN)?;
        validate_text("location", &self.location, MAX_TEXT_FIELD_LEN)?;
        validate_optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        normalize_hazards(&mut self.hazards)?;

        if !date_range_is_valid(self.start_date, self.end_date) {
            return Err(CreateJobError::InvalidDateRange);
        }
        Ok(self)
    }
}

#[tracing::instrument(skip(pool, actor, command), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    command: CreateJobCommand,
) -> Result<JobRecord, CreateJobError> {
    let command = command.normalize()?;
    let risk = assess(&command.hazards);
    let status = command.status.unwrap_or(JobStatus::Planned);

    let mut tx = pool.begin().await?;

    let job = sqlx::query_as::<_, JobRecord>(&format!(
        r#"
        INSERT INTO jobs (
            organization_id, client_name, job_type, location, description, status,
            hazards, risk_score, risk_level, start_date, end_date, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(actor.organization_id)
    .bind(&command.client_name)
    .bind(&command.job_type)
    .bind(&command.location)
    .bind(&command.description)
    .bind(status.as_str())
    .bind(Json(&command.hazards))
    .bind(risk.score)
    .bind(risk.level.as_str())
    .bind(command.start_date)
    .bind(command.end_date)
    .bind(actor.user_id)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "job.created")
            .target("job", job.id)
            .job(job.id)
            .metadata(json!({
                "client_name": job.client_name,
                "job_type": job.job_type,
                "status": job.status,
                "risk_score": job.risk_score,
                "risk_level": job.risk_level,
                "hazard_count": job.hazards.len(),
            }))
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(job_id = %job.id, risk_level = %job.risk_level, "Job created");

    Ok(job)
}
