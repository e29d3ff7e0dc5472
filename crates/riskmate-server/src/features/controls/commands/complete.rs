//! Complete control command

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::controls::types::{ControlRecord, CONTROL_COLUMNS};
use crate::features::jobs::queries::{require_open_job, JobAccessError};
use crate::rbac::ActorContext;

#[derive(Debug, thiserror::Error)]
pub enum CompleteControlError {
    #[error("Control '{0}' not found")]
    NotFound(Uuid),

    #[error("Control '{0}' is already completed")]
    AlreadyCompleted(Uuid),

    #[error(transparent)]
    Job(#[from] JobAccessError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CompleteControlError> for AppError {
    fn from(err: CompleteControlError) -> Self {
        match err {
            CompleteControlError::NotFound(_) => AppError::NotFound(err.to_string()),
            CompleteControlError::AlreadyCompleted(_) => AppError::Conflict(err.to_string()),
            CompleteControlError::Job(e) => e.into(),
            CompleteControlError::Database(e) => AppError::Database(e),
        }
    }
}

#[tracing::instrument(skip(pool, actor), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    job_id: Uuid,
    control_id: Uuid,
) -> Result<ControlRecord, CompleteControlError> {
    let mut tx = pool.begin().await?;
    require_open_job(&mut *tx, actor.organization_id, job_id).await?;

    let control = sqlx::query_as::<_, ControlRecord>(&format!(
        r#"
        SELECT {CONTROL_COLUMNS}
        FROM controls
        WHERE id = $1 AND job_id = $2 AND organization_id = $3
        FOR UPDATE
        "#
    ))
    .bind(control_id)
    .bind(job_id)
    .bind(actor.organization_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CompleteControlError::NotFound(control_id))?;

    if control.is_completed {
        return Err(CompleteControlError::AlreadyCompleted(control_id));
    }

    let completed = sqlx::query_as::<_, ControlRecord>(&format!(
        r#"
        UPDATE controls
        SET is_completed = TRUE, completed_at = NOW(), completed_by = $2
        WHERE id = $1
        RETURNING {CONTROL_COLUMNS}
        "#
    ))
    .bind(control_id)
    .bind(actor.user_id)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "control.completed")
            .target("control", control_id)
            .job(job_id)
            .metadata(json!({
                "title": completed.title,
                "hazard_code": completed.hazard_code,
            }))
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(control_id = %control_id, "Control completed");

    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::from(CompleteControlError::NotFound(id)).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(CompleteControlError::AlreadyCompleted(id)).status(),
            StatusCode::CONFLICT
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_completing_twice_conflicts(pool: PgPool) -> sqlx::Result<()> {
        use crate::features::controls::commands::create::{self, CreateControlCommand};
        use crate::features::shared::fixtures;
        use crate::rbac::Role;

        let org = fixtures::organization(&pool).await;
        let actor = fixtures::member(&pool, org, Role::SafetyLead).await;
        let job = fixtures::job(&pool, &actor).await;
        let control = create::handle(
            &pool,
            &actor,
            job.id,
            CreateControlCommand {
                title: "Guardrails".to_string(),
                description: None,
                hazard_code: None,
            },
        )
        .await
        .unwrap();

        let done = handle(&pool, &actor, job.id, control.id).await.unwrap();
        assert!(done.is_completed);
        assert_eq!(done.completed_by, Some(actor.user_id));

        assert!(matches!(
            handle(&pool, &actor, job.id, control.id).await,
            Err(CompleteControlError::AlreadyCompleted(_))
        ));
        Ok(())
    }
}
