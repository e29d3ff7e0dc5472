//! Role-based access control
//!
//! Riskmate uses a static five-level hierarchy:
//!
//! ```text
//! owner (5) > admin (4) > executive (3) > safety_lead (2) > member (1)
//! ```
//!
//! Permission checks are plain rank comparisons. Executives see everything an
//! admin sees but cannot write; [`ReadOnlyLayer`] rejects their write verbs
//! before any handler runs and records the attempt in the audit ledger.

mod middleware;

pub use middleware::{
    require_write_access, ReadOnlyLayer, ReadOnlyMiddleware, READ_ONLY_ERROR_CODE,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Organization role, ordered by rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Executive,
    SafetyLead,
    Member,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Admin,
        Role::Executive,
        Role::SafetyLead,
        Role::Member,
    ];

    pub fn rank(self) -> u8 {
        match self {
            Role::Owner => 5,
            Role::Admin => 4,
            Role::Executive => 3,
            Role::SafetyLead => 2,
            Role::Member => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Executive => "executive",
            Role::SafetyLead => "safety_lead",
            Role::Member => "member",
        }
    }

    /// Human label used in generated documents
    pub fn label(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Admin => "Admin",
            Role::Executive => "Executive",
            Role::SafetyLead => "Safety Lead",
            Role::Member => "Member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown role: '{0}'")]
pub struct RoleParseError(pub String);

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "executive" => Ok(Role::Executive),
            "safety_lead" => Ok(Role::SafetyLead),
            "member" => Ok(Role::Member),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

/// `true` when `role` ranks at or above `minimum`
pub fn has_role_at_least(role: Role, minimum: Role) -> bool {
    role.rank() >= minimum.rank()
}

/// Roles that may read everything but write nothing
pub fn is_read_only(role: Role) -> bool {
    matches!(role, Role::Executive)
}

/// Reasons a membership change is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoleChangeDenied {
    #[error("Only owners and admins can manage team members")]
    NotAManager,
    #[error("Only owners can grant the owner role")]
    OwnerGrantRequiresOwner,
    #[error("Cannot manage a member whose role is equal to or above your own")]
    TargetOutranksActor,
    #[error("Cannot assign a role above your own")]
    RoleAboveActor,
}

/// Check whether `actor` may move a member from `target_current` to `target_new`
///
/// Removal is checked with `target_new == target_current`.
pub fn can_manage_member(
    actor: Role,
    target_current: Role,
    target_new: Role,
) -> Result<(), RoleChangeDenied> {
    if !has_role_at_least(actor, Role::Admin) {
        return Err(RoleChangeDenied::NotAManager);
    }
    if target_new == Role::Owner && actor != Role::Owner {
        return Err(RoleChangeDenied::OwnerGrantRequiresOwner);
    }
    if actor == Role::Owner {
        return Ok(());
    }
    if actor.rank() <= target_current.rank() {
        return Err(RoleChangeDenied::TargetOutranksActor);
    }
    if target_new.rank() > actor.rank() {
        return Err(RoleChangeDenied::RoleAboveActor);
    }
    Ok(())
}

/// Authenticated caller, inserted into request extensions by `auth::authenticate`
#[derive(Debug, Clone, Serialize)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
    pub email: String,
    pub full_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ActorContext {
    /// Reject callers ranked below `minimum`
    pub fn require_role(&self, minimum: Role) -> Result<(), AccessDenied> {
        if has_role_at_least(self.role, minimum) {
            Ok(())
        } else {
            Err(AccessDenied {
                required: minimum,
                actual: self.role,
            })
        }
    }

    /// Name shown on documents and attestations
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("This action requires the {required} role or higher (current role: {actual})")]
pub struct AccessDenied {
    pub required: Role,
    pub actual: Role,
}

impl From<AccessDenied> for AppError {
    fn from(err: AccessDenied) -> Self {
        AppError::Forbidden(err.to_string())
    }
}

impl From<RoleChangeDenied> for AppError {
    fn from(err: RoleChangeDenied) -> Self {
        AppError::Forbidden(err.to_string())
    }
}
