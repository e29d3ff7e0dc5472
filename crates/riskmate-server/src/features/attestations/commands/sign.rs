//! Sign-off on a job by the caller

use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::attestations::types::{
    signature_hash, AttestationRecord, ATTESTATION_COLUMNS,
};
use crate::features::jobs::commands::{MAX_DESCRIPTION_LEN, MAX_TEXT_FIELD_LEN};
use crate::features::jobs::queries::{require_open_job, JobAccessError};
use crate::features::shared::{normalize_optional, validate_text, TextValidationError};
use crate::rbac::{AccessDenied, ActorContext, Role};

pub const SIGN_MIN_ROLE: Role = Role::SafetyLead;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignAttestationCommand {
    /// Defaults to the caller's name
    #[serde(default)]
    pub signer_name: Option<String>,
    pub signer_title: String,
    pub statement: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SignAttestationError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    #[error(transparent)]
    Field(#[from] TextValidationError),

    #[error(transparent)]
    Job(#[from] JobAccessError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<SignAttestationError> for AppError {
    fn from(err: SignAttestationError) -> Self {
        match err {
            SignAttestationError::Forbidden(e) => e.into(),
            SignAttestationError::Field(e) => AppError::Validation(e.to_string()),
            SignAttestationError::Job(e) => e.into(),
            SignAttestationError::Database(e) => AppError::Database(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    signer_name: String,
    signer_title: String,
    statement: String,
}

impl SignAttestationCommand {
    fn into_signature(self, actor: &ActorContext) -> Result<Signature, TextValidationError> {
        let signer_name = normalize_optional(self.signer_name)
            .unwrap_or_else(|| actor.display_name().to_string());
        let signer_title = self.signer_title.trim().to_string();
        let statement = self.statement.trim().to_string();

        validate_text("signer_name", &signer_name, MAX_TEXT_FIELD_LEN)?;
        validate_text("signer_title", &signer_title, MAX_TEXT_FIELD_LEN)?;
        validate_text("statement", &statement, MAX_DESCRIPTION_LEN)?;

        Ok(Signature {
            signer_name,
            signer_title,
            statement,
        })
    }
}

#[tracing::instrument(skip(pool, actor, command), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    job_id: Uuid,
    command: SignAttestationCommand,
) -> Result<AttestationRecord, SignAttestationError> {
    actor.require_role(SIGN_MIN_ROLE)?;
    let signature = command.into_signature(actor)?;

    let mut tx = pool.begin().await?;
    require_open_job(&mut *tx, actor.organization_id, job_id).await?;

    // stored precision, so the hash can be recomputed from the row
    let signed_at = Utc::now().trunc_subsecs(6);
    let hash = signature_hash(job_id, actor.user_id, &signature.statement, &signed_at);

    let record = sqlx::query_as::<_, AttestationRecord>(&format!(
        r#"
        INSERT INTO attestations (
            organization_id, job_id, signer_id, signer_name, signer_title,
            statement, signature_hash, signed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {ATTESTATION_COLUMNS}
        "#
    ))
    .bind(actor.organization_id)
    .bind(job_id)
    .bind(actor.user_id)
    .bind(&signature.signer_name)
    .bind(&signature.signer_title)
    .bind(&signature.statement)
    .bind(&hash)
    .bind(signed_at)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "attestation.signed")
            .target("attestation", record.id)
            .job(job_id)
            .metadata(json!({
                "signer_name": record.signer_name,
                "signer_title": record.signer_title,
                "signature_hash": record.signature_hash,
            }))
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(attestation_id = %record.id, job_id = %job_id, "Attestation signed");

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::test_support::actor;
    use axum::http::StatusCode;

    fn command() -> SignAttestationCommand {
        SignAttestationCommand {
            signer_name: None,
            signer_title: " Site Supervisor ".to_string(),
            statement: "Controls verified".to_string(),
        }
    }

    #[test]
    fn test_signer_name_defaults_to_actor() {
        let lead = actor(Role::SafetyLead);
        let signature = command().into_signature(&lead).unwrap();
        assert_eq!(signature.signer_name, lead.display_name());
        assert_eq!(signature.signer_title, "Site Supervisor");
    }

    #[test]
    fn test_blank_statement_rejected() {
        let cmd = SignAttestationCommand {
            statement: "  ".to_string(),
            ..command()
        };
        assert_eq!(
            cmd.into_signature(&actor(Role::Owner)),
            Err(TextValidationError::Required { field: "statement" })
        );
    }

    #[tokio::test]
    async fn test_member_cannot_sign() {
        let state = crate::app::test_support::state().await;
        let err = handle(&state.db, &actor(Role::Member), Uuid::new_v4(), command())
            .await
            .unwrap_err();
        assert_eq!(AppError::from(err).status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_signed_attestation_verifies(pool: PgPool) -> sqlx::Result<()> {
        use crate::features::shared::fixtures;

        let org = fixtures::organization(&pool).await;
        let lead = fixtures::member(&pool, org, Role::SafetyLead).await;
        let job = fixtures::job(&pool, &lead).await;

        let record = handle(&pool, &lead, job.id, command()).await.unwrap();
        assert!(record.signature_is_valid());
        assert_eq!(record.signer_id, lead.user_id);
        Ok(())
    }
}
