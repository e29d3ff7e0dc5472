use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Row from the `controls` table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ControlRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub hazard_code: Option<String>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

pub(crate) const CONTROL_COLUMNS: &str = r#"
    id, organization_id, job_id, title, description, hazard_code, is_completed,
    completed_at, completed_by, created_by, created_at
"#;
