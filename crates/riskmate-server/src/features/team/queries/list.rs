//! Organization members

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::team::types::{MemberRecord, MEMBER_COLUMNS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMembersQuery {
    /// Include removed members
    #[serde(default)]
    pub include_removed: bool,
}

/// Members ordered by role seniority, then name
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: &PgPool,
    organization_id: Uuid,
    query: ListMembersQuery,
) -> Result<Vec<MemberRecord>, sqlx::Error> {
    sqlx::query_as::<_, MemberRecord>(&format!(
        r#"
        SELECT {MEMBER_COLUMNS}
        FROM users
        WHERE organization_id = $1 AND ($2 OR archived_at IS NULL)
        ORDER BY CASE role
                    WHEN 'owner' THEN 1
                    WHEN 'admin' THEN 2
                    WHEN 'executive' THEN 3
                    WHEN 'safety_lead' THEN 4
                    ELSE 5
                 END,
                 COALESCE(full_name, email)
        "#
    ))
    .bind(organization_id)
    .bind(query.include_removed)
    .fetch_all(pool)
    .await
}
