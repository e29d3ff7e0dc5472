use chrono::{DateTime, Utc};
use riskmate_common::{checksum::sha256_hex, ledger::format_timestamp};
use serde::Serialize;
use uuid::Uuid;

/// Row from the `attestations` table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AttestationRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub signer_id: Uuid,
    pub signer_name: String,
    pub signer_title: String,
    pub statement: String,
    pub signature_hash: String,
    pub signed_at: DateTime<Utc>,
}

impl AttestationRecord {
    /// `true` when the stored hash still matches the signed fields
    pub fn signature_is_valid(&self) -> bool {
        signature_hash(self.job_id, self.signer_id, &self.statement, &self.signed_at)
            == self.signature_hash
    }
}

pub(crate) const ATTESTATION_COLUMNS: &str = r#"
    id, organization_id, job_id, signer_id, signer_name, signer_title,
    statement, signature_hash, signed_at
"#;

/// `SHA-256(job_id | signer_id | statement | signed_at)` as lowercase hex
pub fn signature_hash(
    job_id: Uuid,
    signer_id: Uuid,
    statement: &str,
    signed_at: &DateTime<Utc>,
) -> String {
    let payload = format!(
        "{}|{}|{}|{}",
        job_id,
        signer_id,
        statement,
        format_timestamp(signed_at)
    );
    sha256_hex(payload.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> AttestationRecord {
        let job_id = Uuid::new_v4();
        let signer_id = Uuid::new_v4();
        let signed_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        AttestationRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            job_id,
            signer_id,
            signer_name: "Dana Reyes".to_string(),
            signer_title: "Site Safety Lead".to_string(),
            statement: "All controls verified on site".to_string(),
            signature_hash: signature_hash(job_id, signer_id, "All controls verified on site", &signed_at),
            signed_at,
        }
    }

    #[test]
    fn test_signature_is_stable_hex() {
        let r = record();
        assert_eq!(r.signature_hash.len(), 64);
        assert_eq!(
            r.signature_hash,
            signature_hash(r.job_id, r.signer_id, &r.statement, &r.signed_at)
        );
    }

    #[test]
    fn test_edited_statement_breaks_signature() {
        let mut r = record();
        assert!(r.signature_is_valid());
        r.statement.push_str(" (amended)");
        assert!(!r.signature_is_valid());
    }
}
