use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::rbac::{Role, RoleParseError};

/// A user in the caller's organization
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl MemberRecord {
    pub fn parsed_role(&self) -> Result<Role, RoleParseError> {
        self.role.parse()
    }
}

pub(crate) const MEMBER_COLUMNS: &str =
    "id, organization_id, email, full_name, role, created_at, archived_at";
