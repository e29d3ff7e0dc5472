//! Remove a member
//!
//! Removal archives the user. Their ledger history, attestations and
//! uploads keep pointing at the row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{lock_active_owner_count, lock_member};
use crate::audit::{record_audit_log, AuditSeverity, NewAuditEvent};
use crate::error::AppError;
use crate::rbac::{can_manage_member, has_role_at_least, ActorContext, Role, RoleChangeDenied};

#[derive(Debug, Clone, Serialize)]
pub struct RemoveMemberResponse {
    pub id: Uuid,
    pub archived_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoveMemberError {
    #[error("You cannot remove yourself")]
    SelfRemoval,

    #[error(transparent)]
    Denied(#[from] RoleChangeDenied),

    #[error("Member '{0}' not found")]
    NotFound(Uuid),

    #[error("Member has an unrecognized role '{0}'")]
    InvalidStoredRole(String),

    #[error("The organization must keep at least one owner")]
    LastOwner,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<RemoveMemberError> for AppError {
    fn from(err: RemoveMemberError) -> Self {
        match err {
            RemoveMemberError::SelfRemoval => AppError::Forbidden(err.to_string()),
            RemoveMemberError::Denied(e) => e.into(),
            RemoveMemberError::NotFound(_) => AppError::NotFound(err.to_string()),
            RemoveMemberError::InvalidStoredRole(_) => AppError::Internal(err.to_string()),
            RemoveMemberError::LastOwner => AppError::Conflict(err.to_string()),
            RemoveMemberError::Database(e) => AppError::Database(e),
        }
    }
}

#[tracing::instrument(skip(pool, actor), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    member_id: Uuid,
) -> Result<RemoveMemberResponse, RemoveMemberError> {
    if member_id == actor.user_id {
        return Err(RemoveMemberError::SelfRemoval);
    }
    if !has_role_at_least(actor.role, Role::Admin) {
        return Err(RoleChangeDenied::NotAManager.into());
    }

    let mut tx = pool.begin().await?;

    let member = lock_member(&mut *tx, actor.organization_id, member_id)
        .await?
        .ok_or(RemoveMemberError::NotFound(member_id))?;
    let role = member
        .parsed_role()
        .map_err(|e| RemoveMemberError::InvalidStoredRole(e.0))?;

    can_manage_member(actor.role, role, role)?;

    if role == Role::Owner && lock_active_owner_count(&mut *tx, actor.organization_id).await? <= 1 {
        return Err(RemoveMemberError::LastOwner);
    }

    let archived_at: DateTime<Utc> = sqlx::query_scalar(
        "UPDATE users SET archived_at = NOW() WHERE id = $1 RETURNING archived_at",
    )
    .bind(member_id)
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "team.member_removed")
            .target("user", member_id)
            .metadata(json!({
                "email": member.email,
                "role": role.as_str(),
            }))
            .severity(AuditSeverity::Material)
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(member_id = %member_id, "Member removed");

    Ok(RemoveMemberResponse {
        id: member_id,
        archived_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::test_support::actor;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_cannot_remove_self() {
        let state = crate::app::test_support::state().await;
        let admin = actor(Role::Admin);
        let err = handle(&state.db, &admin, admin.user_id).await.unwrap_err();
        assert_eq!(AppError::from(err).status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_executive_cannot_remove() {
        let state = crate::app::test_support::state().await;
        let err = handle(&state.db, &actor(Role::Executive), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoveMemberError::Denied(RoleChangeDenied::NotAManager)));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_removal_is_material_and_soft(pool: PgPool) -> sqlx::Result<()> {
        use crate::audit::{query_audit_logs, AuditQuery};
        use crate::features::shared::fixtures;

        let org = fixtures::organization(&pool).await;
        let owner = fixtures::member(&pool, org, Role::Owner).await;
        let worker = fixtures::member(&pool, org, Role::Member).await;

        handle(&pool, &owner, worker.user_id).await.unwrap();

        let archived: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT archived_at FROM users WHERE id = $1")
                .bind(worker.user_id)
                .fetch_one(&pool)
                .await?;
        assert!(archived.is_some());

        let events = query_audit_logs(&pool, org, &AuditQuery::default()).await?;
        assert_eq!(events[0].event_name, "team.member_removed");
        assert_eq!(events[0].severity, "material");

        assert!(matches!(
            handle(&pool, &owner, worker.user_id).await,
            Err(RemoveMemberError::NotFound(_))
        ));
        Ok(())
    }
}
