//! Create control command
//!
//! A control is a mitigation planned against a job's hazards. When a
//! `hazard_code` is given it must name a hazard listed on the job.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::controls::types::{ControlRecord, CONTROL_COLUMNS};
use crate::features::jobs::commands::{MAX_DESCRIPTION_LEN, MAX_TEXT_FIELD_LEN};
use crate::features::jobs::queries::{require_open_job, JobAccessError};
use crate::features::shared::{
    normalize_optional, validate_optional_text, validate_text, TextValidationError,
};
use crate::rbac::ActorContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateControlCommand {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hazard_code: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateControlError {
    #[error(transparent)]
    Field(#[from] TextValidationError),

    #[error("Hazard '{0}' is not listed on this job")]
    UnknownHazard(String),

    #[error(transparent)]
    Job(#[from] JobAccessError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CreateControlError> for AppError {
    fn from(err: CreateControlError) -> Self {
        match err {
            CreateControlError::Job(e) => e.into(),
            CreateControlError::Database(e) => AppError::Database(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl CreateControlCommand {
    pub fn normalize(mut self) -> Result<Self, CreateControlError> {
        self.title = self.title.trim().to_string();
        self.description = normalize_optional(self.description);
        self.hazard_code = normalize_optional(self.hazard_code).map(|c| c.to_uppercase());

        validate_text("title", &self.title, MAX_TEXT_FIELD_LEN)?;
        validate_optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        Ok(self)
    }
}

#[tracing::instrument(skip(pool, actor, command), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    job_id: Uuid,
    command: CreateControlCommand,
) -> Result<ControlRecord, CreateControlError> {
    let command = command.normalize()?;

    let mut tx = pool.begin().await?;
    let job = require_open_job(&mut *tx, actor.organization_id, job_id).await?;

    if let Some(code) = &command.hazard_code {
        if !job.hazards.iter().any(|h| &h.code == code) {
            return Err(CreateControlError::UnknownHazard(code.clone()));
        }
    }

    let control = sqlx::query_as::<_, ControlRecord>(&format!(
        r#"
        INSERT INTO controls (organization_id, job_id, title, description, hazard_code, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {CONTROL_COLUMNS}
        "#
    ))
    .bind(actor.organization_id)
    .bind(job_id)
    .bind(&command.title)
    .bind(&command.description)
    .bind(&command.hazard_code)
    .bind(actor.user_id)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "control.created")
            .target("control", control.id)
            .job(job_id)
            .metadata(json!({
                "title": control.title,
                "hazard_code": control.hazard_code,
            }))
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(control_id = %control.id, job_id = %job_id, "Control created");

    Ok(control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uppercases_hazard_code() {
        let cmd = CreateControlCommand {
            title: " Install guardrails ".to_string(),
            description: None,
            hazard_code: Some(" wah ".to_string()),
        }
        .normalize()
        .unwrap();
        assert_eq!(cmd.title, "Install guardrails");
        assert_eq!(cmd.hazard_code.as_deref(), Some("WAH"));
    }

    #[test]
    fn test_blank_hazard_code_is_dropped() {
        let cmd = CreateControlCommand {
            title: "Toolbox talk".to_string(),
            description: None,
            hazard_code: Some("".to_string()),
        }
        .normalize()
        .unwrap();
        assert!(cmd.hazard_code.is_none());
    }

    #[test]
    fn test_archived_job_maps_to_conflict() {
        let err = AppError::from(CreateControlError::Job(JobAccessError::Archived(Uuid::new_v4())));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
        let err = AppError::from(CreateControlError::UnknownHazard("ELEC".into()));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_control_must_reference_job_hazard(pool: PgPool) -> sqlx::Result<()> {
        use crate::features::shared::fixtures;
        use crate::rbac::Role;

        let org = fixtures::organization(&pool).await;
        let actor = fixtures::member(&pool, org, Role::Member).await;
        let job = fixtures::job(&pool, &actor).await;

        let unknown = CreateControlCommand {
            title: "Lockout".to_string(),
            description: None,
            hazard_code: Some("ELEC".to_string()),
        };
        assert!(matches!(
            handle(&pool, &actor, job.id, unknown).await,
            Err(CreateControlError::UnknownHazard(_))
        ));

        let known = CreateControlCommand {
            title: "Harness and anchor points".to_string(),
            description: None,
            hazard_code: Some("wah".to_string()),
        };
        let control = handle(&pool, &actor, job.id, known).await.unwrap();
        assert!(!control.is_completed);
        assert_eq!(control.hazard_code.as_deref(), Some("WAH"));
        Ok(())
    }
}
