use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Row from the `evidence` table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EvidenceRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

pub(crate) const EVIDENCE_COLUMNS: &str = r#"
    id, organization_id, job_id, file_name, storage_key, content_type,
    size_bytes, sha256, uploaded_by, created_at
"#;

/// A file received from a multipart upload
#[derive(Debug, Clone)]
pub struct EvidenceUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Short-lived link to an evidence file
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceDownload {
    pub id: Uuid,
    pub file_name: String,
    pub url: String,
    pub expires_in_secs: u64,
}
