//! Update job command
//!
//! Partial update. Fields left out keep their stored values; a blank
//! `description` clears it. Changing the hazard list re-scores the job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{
    date_range_is_valid, normalize_hazards, HazardValidationError, MAX_DESCRIPTION_LEN,
    MAX_TEXT_FIELD_LEN,
};
use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::jobs::queries::lock_job;
use crate::features::jobs::risk::assess;
use crate::features::jobs::types::{Hazard, JobRecord, JobStatus, JOB_COLUMNS};
use crate::features::shared::{
    normalize_optional, validate_optional_text, validate_text, TextValidationError,
};
use crate::rbac::ActorContext;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateJobCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hazards: Option<Vec<Hazard>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateJobError {
    #[error("At least one field must be provided for update")]
    NoFieldsToUpdate,

    #[error(transparent)]
    Field(#[from] TextValidationError),

    #[error(transparent)]
    Hazard(#[from] HazardValidationError),

    #[error("End date cannot be before the start date")]
    InvalidDateRange,

    #[error("Job '{0}' not found")]
    NotFound(Uuid),

    #[error("Job '{0}' is archived and can no longer be changed")]
    Archived(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<UpdateJobError> for AppError {
    fn from(err: UpdateJobError) -> Self {
        match err {
            UpdateJobError::NotFound(_) => AppError::NotFound(err.to_string()),
            UpdateJobError::Archived(_) => AppError::Conflict(err.to_string()),
            UpdateJobError::Database(e) => AppError::Database(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl UpdateJobCommand {
    pub fn is_empty(&self) -> bool {
        self.client_name.is_none()
            && self.job_type.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.hazards.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    pub fn normalize(mut self) -> Result<Self, UpdateJobError> {
        if self.is_empty() {
            return Err(UpdateJobError::NoFieldsToUpdate);
        }

        for (field, value) in [
            ("client_name", &mut self.client_name),
            ("job_type", &mut self.job_type),
            ("location", &mut self.location),
        ] {
            if let Some(v) = value {
                *v = v.trim().to_string();
                validate_text(field, v, MAX_TEXT_FIELD_LEN)?;
            }
        }

        if let Some(description) = &self.description {
            validate_optional_text("description", Some(description.trim()), MAX_DESCRIPTION_LEN)?;
        }
        if let Some(hazards) = self.hazards.as_mut() {
            normalize_hazards(hazards)?;
        }
        Ok(self)
    }
}

/// Names of the fields that differ between two versions of a job
fn changed_fields(before: &JobRecord, after: &JobRecord) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if before.client_name != after.client_name {
        changed.push("client_name");
    }
    if before.job_type != after.job_type {
        changed.push("job_type");
    }
    if before.location != after.location {
        changed.push("location");
    }
    if before.description != after.description {
        changed.push("description");
    }
    if before.status != after.status {
        changed.push("status");
    }
    if before.hazards.0 != after.hazards.0 {
        changed.push("hazards");
    }
    if before.start_date != after.start_date {
        changed.push("start_date");
    }
    if before.end_date != after.end_date {
        changed.push("end_date");
    }
    changed
}

fn update_metadata(before: &JobRecord, after: &JobRecord) -> JsonValue {
    let mut metadata = Map::new();
    metadata.insert("changed".to_string(), json!(changed_fields(before, after)));

    if before.status != after.status {
        metadata.insert("from".to_string(), json!(before.status));
        metadata.insert("to".to_string(), json!(after.status));
    }
    if before.risk_score != after.risk_score {
        metadata.insert(
            "risk".to_string(),
            json!({
                "from_score": before.risk_score,
                "to_score": after.risk_score,
                "from_level": before.risk_level,
                "to_level": after.risk_level,
            }),
        );
    }
    JsonValue::Object(metadata)
}

#[tracing::instrument(skip(pool, actor, command), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    job_id: Uuid,
    command: UpdateJobCommand,
) -> Result<JobRecord, UpdateJobError> {
    let command = command.normalize()?;

    let mut tx = pool.begin().await?;

    let current = lock_job(&mut *tx, actor.organization_id, job_id)
        .await?
        .ok_or(UpdateJobError::NotFound(job_id))?;

    if current.is_archived() {
        return Err(UpdateJobError::Archived(job_id));
    }

    let start_date = command.start_date.or(current.start_date);
    let end_date = command.end_date.or(current.end_date);
    if !date_range_is_valid(start_date, end_date) {
        return Err(UpdateJobError::InvalidDateRange);
    }

    let hazards = command.hazards.unwrap_or_else(|| current.hazards.0.clone());
    let risk = assess(&hazards);
    let description = match command.description {
        Some(d) => normalize_optional(Some(d)),
        None => current.description.clone(),
    };
    let status = command
        .status
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| current.status.clone());

    let updated = sqlx::query_as::<_, JobRecord>(&format!(
        r#"
        UPDATE jobs
        SET client_name = $3, job_type = $4, location = $5, description = $6,
            status = $7, hazards = $8, risk_score = $9, risk_level = $10,
            start_date = $11, end_date = $12, updated_at = NOW()
        WHERE id = $1 AND organization_id = $2
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(job_id)
    .bind(actor.organization_id)
    .bind(command.client_name.as_ref().unwrap_or(&current.client_name))
    .bind(command.job_type.as_ref().unwrap_or(&current.job_type))
    .bind(command.location.as_ref().unwrap_or(&current.location))
    .bind(&description)
    .bind(&status)
    .bind(Json(&hazards))
    .bind(risk.score)
    .bind(risk.level.as_str())
    .bind(start_date)
    .bind(end_date)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "job.updated")
            .target("job", job_id)
            .job(job_id)
            .metadata(update_metadata(&current, &updated))
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(job_id = %job_id, "Job updated");

    Ok(updated)
}
