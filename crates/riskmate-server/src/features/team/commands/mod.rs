pub mod change_role;
pub mod remove;

pub use change_role::{ChangeRoleCommand, ChangeRoleError};
pub use remove::RemoveMemberError;

use sqlx::PgConnection;
use uuid::Uuid;

use super::types::{MemberRecord, MEMBER_COLUMNS};

/// Lock an active member of the organization
pub(crate) async fn lock_member(
    conn: &mut PgConnection,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MemberRecord>, sqlx::Error> {
    sqlx::query_as::<_, MemberRecord>(&format!(
        r#"
        SELECT {MEMBER_COLUMNS}
        FROM users
        WHERE id = $1 AND organization_id = $2 AND archived_at IS NULL
        FOR UPDATE
        "#
    ))
    .bind(user_id)
    .bind(organization_id)
    .fetch_optional(conn)
    .await
}

/// Number of active owners, locking their rows so two concurrent demotions
/// cannot both see a second owner
pub(crate) async fn lock_active_owner_count(
    conn: &mut PgConnection,
    organization_id: Uuid,
) -> Result<usize, sqlx::Error> {
    let owners: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id
        FROM users
        WHERE organization_id = $1 AND role = 'owner' AND archived_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(organization_id)
    .fetch_all(conn)
    .await?;
    Ok(owners.len())
}
