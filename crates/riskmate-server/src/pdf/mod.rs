//! PDF documents derived from jobs and the audit ledger
//!
//! Generators take plain data gathered by the caller and return PDF bytes.
//! None of them touch the database, so they render the same output for the
//! same input and are tested without one.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::AppError;

pub mod attestations_report;
pub mod controls_report;
pub mod job_report;
pub mod layout;
pub mod ledger_export;

pub use attestations_report::{render_attestations_report, AttestationsReportData, JobAttestations};
pub use controls_report::{render_controls_report, ControlsReportData, JobControls};
pub use job_report::{render_job_report, JobReportData};
pub use layout::PdfCanvas;
pub use ledger_export::{render_ledger_export, LedgerExportData};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to load font: {0}")]
    Font(String),

    #[error("Failed to write PDF: {0}")]
    Save(String),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        AppError::Render(err.to_string())
    }
}

/// Who a document was produced for, and when
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub organization_name: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
}

impl ReportContext {
    pub fn footer(&self) -> String {
        format!(
            "{} | Generated {} | Riskmate",
            self.organization_name,
            format_time(&self.generated_at)
        )
    }

    pub(crate) fn cover_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Organization", self.organization_name.clone()),
            ("Generated", format_time(&self.generated_at)),
            ("Generated by", self.generated_by.clone()),
        ]
    }
}

pub fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn format_optional_time(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(format_time).unwrap_or_else(|| "-".to_string())
}

/// Last `n` characters of a hash, for tables too narrow for all 64
pub fn hash_suffix(hash: &str, n: usize) -> String {
    let start = hash.len().saturating_sub(n);
    match hash.get(start..) {
        Some(tail) if start > 0 => format!("...{tail}"),
        _ => hash.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    use crate::audit::{classify, AuditEvent};
    use crate::features::attestations::{signature_hash, AttestationRecord};
    use crate::features::controls::ControlRecord;
    use crate::features::evidence::EvidenceRecord;
    use crate::features::jobs::{Hazard, HazardSeverity, JobRecord};
    use riskmate_common::ledger::{compute_record_hash, GENESIS_HASH};
    use serde_json::json;
    use sqlx::types::Json;
    use uuid::Uuid;

    pub fn context() -> ReportContext {
        ReportContext {
            organization_name: "Harbor Builders".to_string(),
            generated_at: Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap(),
            generated_by: "Dana Reyes".to_string(),
        }
    }

    pub fn job() -> JobRecord {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        JobRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            client_name: "Harbor Logistics".to_string(),
            job_type: "Roof repair".to_string(),
            location: "Pier 4, Warehouse B".to_string(),
            description: Some("Replace damaged roof panels over the loading bay.".to_string()),
            status: "active".to_string(),
            hazards: Json(vec![
                Hazard {
                    code: "WAH".to_string(),
                    name: "Working at height".to_string(),
                    severity: HazardSeverity::Critical,
                },
                Hazard {
                    code: "ELEC".to_string(),
                    name: "Overhead power lines".to_string(),
                    severity: HazardSeverity::High,
                },
            ]),
            risk_score: 40,
            risk_level: "medium".to_string(),
            start_date: None,
            end_date: None,
            created_by: Uuid::new_v4(),
            created_at: at,
            updated_at: at,
            archived_at: None,
        }
    }

    pub fn control(job: &JobRecord, title: &str, done: bool) -> ControlRecord {
        ControlRecord {
            id: Uuid::new_v4(),
            organization_id: job.organization_id,
            job_id: job.id,
            title: title.to_string(),
            description: None,
            hazard_code: Some("WAH".to_string()),
            is_completed: done,
            completed_at: done.then(|| job.created_at),
            completed_by: done.then(|| job.created_by),
            created_by: job.created_by,
            created_at: job.created_at,
        }
    }

    pub fn evidence(job: &JobRecord) -> EvidenceRecord {
        EvidenceRecord {
            id: Uuid::new_v4(),
            organization_id: job.organization_id,
            job_id: job.id,
            file_name: "harness-check.jpg".to_string(),
            storage_key: "organizations/x/jobs/y/evidence/z-harness-check.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            size_bytes: 48_213,
            sha256: "ab".repeat(32),
            uploaded_by: job.created_by,
            created_at: job.created_at,
        }
    }

    pub fn attestation(job: &JobRecord) -> AttestationRecord {
        let signer_id = Uuid::new_v4();
        let statement = "All fall protection controls verified on site.";
        AttestationRecord {
            id: Uuid::new_v4(),
            organization_id: job.organization_id,
            job_id: job.id,
            signer_id,
            signer_name: "Dana Reyes".to_string(),
            signer_title: "Site Safety Lead".to_string(),
            statement: statement.to_string(),
            signature_hash: signature_hash(job.id, signer_id, statement, &job.created_at),
            signed_at: job.created_at,
        }
    }

    /// A correctly chained ledger of `count` events
    pub fn ledger(organization_id: Uuid, count: i64) -> Vec<AuditEvent> {
        let mut prev = GENESIS_HASH.to_string();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        (1..=count)
            .map(|seq| {
                let name = if seq % 2 == 0 { "control.completed" } else { "job.updated" };
                let c = classify(name);
                let mut event = AuditEvent {
                    id: Uuid::new_v4(),
                    organization_id,
                    ledger_seq: seq,
                    actor_id: Some(Uuid::new_v4()),
                    actor_role: Some("safety_lead".to_string()),
                    event_name: name.to_string(),
                    action: c.action,
                    category: c.category.as_str().to_string(),
                    outcome: c.outcome.as_str().to_string(),
                    severity: c.severity.as_str().to_string(),
                    target_type: Some("job".to_string()),
                    target_id: None,
                    job_id: None,
                    metadata: json!({"seq": seq}),
                    ip_address: None,
                    user_agent: None,
                    prev_hash: prev.clone(),
                    hash: String::new(),
                    created_at: start + chrono::Duration::minutes(seq),
                };
                event.hash = compute_record_hash(&event.to_ledger_record());
                prev = event.hash.clone();
                event
            })
            .collect()
    }
}
