//! Ledger export: the hash-chained event log as a printable document

use chrono::{DateTime, Utc};
use riskmate_common::ledger::{ChainVerification, IntegrityStatus};
use uuid::Uuid;

use crate::audit::AuditEvent;

use super::layout::{Column, PdfCanvas};
use super::{format_optional_time, format_time, hash_suffix, PdfError, ReportContext};

#[derive(Debug, Clone)]
pub struct LedgerExportData {
    pub context: ReportContext,
    /// Events in ascending `ledger_seq`
    pub events: Vec<AuditEvent>,
    pub verification: ChainVerification,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub job_id: Option<Uuid>,
}

fn integrity_label(verification: &ChainVerification) -> String {
    match verification.status {
        IntegrityStatus::Verified => format!(
            "VERIFIED ({} events, hash chain intact)",
            verification.events_checked
        ),
        IntegrityStatus::Tampered => format!(
            "TAMPERED at seq {} ({})",
            verification
                .broken_at_seq
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".into()),
            verification.reason.as_deref().unwrap_or("unknown reason")
        ),
        IntegrityStatus::Empty => "EMPTY (no events in period)".to_string(),
        IntegrityStatus::NotVerified => "NOT VERIFIED".to_string(),
    }
}

const EVENT_COLUMNS: [Column; 7] = [
    Column::new("Seq", 12.0),
    Column::new("Time", 30.0),
    Column::new("Event", 42.0),
    Column::new("Actor", 26.0),
    Column::new("Outcome", 18.0),
    Column::new("Severity", 18.0),
    Column::new("Hash", 28.0),
];

pub fn render_ledger_export(data: &LedgerExportData) -> Result<Vec<u8>, PdfError> {
    let mut canvas = PdfCanvas::new("Audit ledger export", &data.context.footer())?;

    canvas.header_band("Audit Ledger Export", "Tamper-evident record of organization activity");

    let mut cover = data.context.cover_fields();
    cover.push((
        "Period",
        format!(
            "{} to {}",
            format_optional_time(data.period_start.as_ref()),
            format_optional_time(data.period_end.as_ref())
        ),
    ));
    if let Some(job_id) = data.job_id {
        cover.push(("Job", job_id.to_string()));
    }
    cover.push(("Events", data.events.len().to_string()));
    cover.push(("Integrity", integrity_label(&data.verification)));
    cover.push((
        "Head hash",
        data.verification
            .head_hash
            .clone()
            .unwrap_or_else(|| "-".to_string()),
    ));
    canvas.key_values(&cover);

    canvas.note(
        "Each event's hash covers the previous event's hash, so altering or removing any \
         event changes every hash after it. Full hashes are included in ledger.json.",
    );

    canvas.heading("Events");
    let rows: Vec<Vec<String>> = data
        .events
        .iter()
        .map(|e| {
            vec![
                e.ledger_seq.to_string(),
                format_time(&e.created_at),
                e.event_name.clone(),
                e.actor_role.clone().unwrap_or_else(|| "system".into()),
                e.outcome.clone(),
                e.severity.clone(),
                hash_suffix(&e.hash, 12),
            ]
        })
        .collect();
    canvas.table(&EVENT_COLUMNS, &rows);

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support;
    use riskmate_common::ledger::verify_chain;

    #[test]
    fn test_integrity_labels() {
        let mut v = verify_chain(&[]);
        assert_eq!(integrity_label(&v), "EMPTY (no events in period)");
        v.status = IntegrityStatus::Tampered;
        v.broken_at_seq = Some(7);
        v.reason = Some("stored hash does not match recomputed hash".into());
        assert!(integrity_label(&v).starts_with("TAMPERED at seq 7"));
    }

    #[test]
    fn test_renders_verified_ledger() {
        let events = test_support::ledger(uuid::Uuid::new_v4(), 120);
        let records: Vec<_> = events.iter().map(AuditEvent::to_ledger_record).collect();
        let verification = verify_chain(&records);
        assert!(verification.is_verified());

        let data = LedgerExportData {
            context: test_support::context(),
            events,
            verification,
            period_start: None,
            period_end: None,
            job_id: None,
        };
        assert!(render_ledger_export(&data).unwrap().starts_with(b"%PDF"));
    }
}
