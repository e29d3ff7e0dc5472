use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::shared::PaginationParams;

/// A generated pack as recorded in `proof_packs`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProofPackRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Option<Uuid>,
    pub generated_by: Uuid,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub sha256: String,
    pub size_bytes: i64,
    pub event_count: i64,
    pub ledger_head_hash: Option<String>,
    pub ledger_integrity: String,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub(crate) const PROOF_PACK_COLUMNS: &str = r#"
    id, organization_id, job_id, generated_by, storage_key, sha256, size_bytes,
    event_count, ledger_head_hash, ledger_integrity, period_start, period_end,
    created_at
"#;

/// Scope of a new pack; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProofPackScope {
    pub job_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ProofPackScope {
    pub fn period_is_valid(&self) -> bool {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProofPacksQuery {
    pub job_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListProofPacksQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_period_validation() {
        let now = Utc::now();
        let mut scope = ProofPackScope::default();
        assert!(scope.period_is_valid());

        scope.start_time = Some(now);
        assert!(scope.period_is_valid());

        scope.end_time = Some(now - Duration::days(1));
        assert!(!scope.period_is_valid());

        scope.end_time = Some(now);
        assert!(scope.period_is_valid());
    }

    #[test]
    fn test_storage_key_not_serialized() {
        let record = ProofPackRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            job_id: None,
            generated_by: Uuid::new_v4(),
            storage_key: "organizations/x/proof-packs/y.zip".to_string(),
            sha256: "00".repeat(32),
            size_bytes: 10,
            event_count: 0,
            ledger_head_hash: None,
            ledger_integrity: "empty".to_string(),
            period_start: None,
            period_end: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("storage_key").is_none());
        assert_eq!(value["ledger_integrity"], "empty");
    }
}
