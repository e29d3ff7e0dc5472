//! Change a member's role

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{lock_active_owner_count, lock_member};
use crate::audit::{record_audit_log, NewAuditEvent};
use crate::error::AppError;
use crate::features::team::types::{MemberRecord, MEMBER_COLUMNS};
use crate::rbac::{can_manage_member, ActorContext, Role, RoleChangeDenied};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRoleCommand {
    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum ChangeRoleError {
    #[error("You cannot change your own role")]
    SelfChange,

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

impl From<ChangeRoleError> for AppError {
    fn from(err: ChangeRoleError) -> Self {
        match err {
            ChangeRoleError::SelfChange => AppError::Forbidden(err.to_string()),
            ChangeRoleError::Denied(e) => e.into(),
            ChangeRoleError::NotFound(_) => AppError::NotFound(err.to_string()),
            ChangeRoleError::InvalidStoredRole(_) => AppError::Internal(err.to_string()),
            ChangeRoleError::LastOwner => AppError::Conflict(err.to_string()),
            ChangeRoleError::Database(e) => AppError::Database(e),
        }
    }
}

#[tracing::instrument(skip(pool, actor), fields(org = %actor.organization_id))]
pub async fn handle(
    pool: &PgPool,
    actor: &ActorContext,
    member_id: Uuid,
    command: ChangeRoleCommand,
) -> Result<MemberRecord, ChangeRoleError> {
    if member_id == actor.user_id {
        return Err(ChangeRoleError::SelfChange);
    }
    if !crate::rbac::has_role_at_least(actor.role, Role::Admin) {
        return Err(RoleChangeDenied::NotAManager.into());
    }

    let mut tx = pool.begin().await?;

    let member = lock_member(&mut *tx, actor.organization_id, member_id)
        .await?
        .ok_or(ChangeRoleError::NotFound(member_id))?;
    let current = member
        .parsed_role()
        .map_err(|e| ChangeRoleError::InvalidStoredRole(e.0))?;

    can_manage_member(actor.role, current, command.role)?;

    if current == command.role {
        return Ok(member);
    }

    if current == Role::Owner && lock_active_owner_count(&mut *tx, actor.organization_id).await? <= 1 {
        return Err(ChangeRoleError::LastOwner);
    }

    let updated = sqlx::query_as::<_, MemberRecord>(&format!(
        "UPDATE users SET role = $2 WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(member_id)
    .bind(command.role.as_str())
    .fetch_one(&mut *tx)
    .await?;

    record_audit_log(
        &mut *tx,
        NewAuditEvent::for_actor(actor, "team.role_changed")
            .target("user", member_id)
            .metadata(json!({
                "email": updated.email,
                "from": current.as_str(),
                "to": command.role.as_str(),
            }))
            .build(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        member_id = %member_id,
        from = %current,
        to = %command.role,
        "Member role changed"
    );

    Ok(updated)
}
