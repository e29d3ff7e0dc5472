//! Job report: everything known about one job in a single document

use crate::audit::AuditEvent;
use crate::features::attestations::AttestationRecord;
use crate::features::controls::ControlRecord;
use crate::features::evidence::EvidenceRecord;
use crate::features::jobs::JobRecord;

use super::layout::{Column, PdfCanvas, SignatureLine};
use super::{format_optional_time, format_time, hash_suffix, PdfError, ReportContext};

/// Most recent ledger entries shown in the activity section
pub const ACTIVITY_LIMIT: usize = 25;

#[derive(Debug, Clone)]
pub struct JobReportData {
    pub context: ReportContext,
    pub job: JobRecord,
    pub controls: Vec<ControlRecord>,
    pub evidence: Vec<EvidenceRecord>,
    pub attestations: Vec<AttestationRecord>,
    /// Ledger events for the job, newest first
    pub activity: Vec<AuditEvent>,
}

fn human_size(bytes: i64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.1} MB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn describe_event(event: &AuditEvent) -> String {
    let actor = event.actor_role.as_deref().unwrap_or("system");
    format!(
        "{} by {} ({}, {})",
        event.event_name, actor, event.outcome, event.severity
    )
}

pub fn render_job_report(data: &JobReportData) -> Result<Vec<u8>, PdfError> {
    let job = &data.job;
    let mut canvas = PdfCanvas::new(&format!("Job report - {}", job.title()), &data.context.footer())?;

    canvas.header_band("Job Safety Report", &job.title());
    let mut cover = data.context.cover_fields();
    cover.push(("Job ID", job.id.to_string()));
    canvas.key_values(&cover);

    canvas.heading("Job summary");
    canvas.key_values(&[
        ("Client", job.client_name.clone()),
        ("Job type", job.job_type.clone()),
        ("Location", job.location.clone()),
        ("Status", job.status.replace('_', " ")),
        (
            "Schedule",
            format!(
                "{} to {}",
                job.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                job.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
            ),
        ),
        ("Created", format_time(&job.created_at)),
        ("Archived", format_optional_time(job.archived_at.as_ref())),
    ]);
    if let Some(description) = &job.description {
        canvas.paragraph(description);
    }

    canvas.heading("Hazards and risk");
    canvas.key_values(&[(
        "Risk score",
        format!("{} / 100 ({})", job.risk_score, job.risk_level.to_uppercase()),
    )]);
    let hazard_rows: Vec<Vec<String>> = job
        .hazards
        .iter()
        .map(|h| vec![h.code.clone(), h.name.clone(), h.severity.as_str().to_string()])
        .collect();
    canvas.table(
        &[
            Column::new("Code", 30.0),
            Column::new("Hazard", 110.0),
            Column::new("Severity", 34.0),
        ],
        &hazard_rows,
    );

    canvas.heading("Controls");
    let completed = data.controls.iter().filter(|c| c.is_completed).count();
    canvas.note(&format!("{completed} of {} controls completed.", data.controls.len()));
    let control_rows: Vec<Vec<String>> = data
        .controls
        .iter()
        .map(|c| {
            vec![
                c.title.clone(),
                c.hazard_code.clone().unwrap_or_else(|| "-".into()),
                if c.is_completed { "Done" } else { "Open" }.to_string(),
                format_optional_time(c.completed_at.as_ref()),
            ]
        })
        .collect();
    canvas.table(
        &[
            Column::new("Control", 88.0),
            Column::new("Hazard", 22.0),
            Column::new("Status", 20.0),
            Column::new("Completed", 44.0),
        ],
        &control_rows,
    );

    canvas.heading("Evidence");
    let evidence_rows: Vec<Vec<String>> = data
        .evidence
        .iter()
        .map(|e| {
            vec![
                e.file_name.clone(),
                human_size(e.size_bytes),
                format_time(&e.created_at),
                hash_suffix(&e.sha256, 16),
            ]
        })
        .collect();
    canvas.table(
        &[
            Column::new("File", 70.0),
            Column::new("Size", 20.0),
            Column::new("Uploaded", 40.0),
            Column::new("SHA-256", 44.0),
        ],
        &evidence_rows,
    );

    canvas.heading("Sign-offs");
    if data.attestations.is_empty() {
        canvas.note("No attestations have been signed for this job.");
    }
    for attestation in &data.attestations {
        canvas.paragraph(&format!("\"{}\"", attestation.statement));
        let signed_at = format_time(&attestation.signed_at);
        canvas.signature_block(&SignatureLine {
            name: &attestation.signer_name,
            title: &attestation.signer_title,
            signed_at: &signed_at,
            fingerprint: &attestation.signature_hash,
        });
    }

    canvas.heading("Recent activity");
    let entries: Vec<(String, String)> = data
        .activity
        .iter()
        .take(ACTIVITY_LIMIT)
        .map(|e| (format_time(&e.created_at), describe_event(e)))
        .collect();
    canvas.timeline(&entries);

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_renders_full_report() {
        let job = test_support::job();
        let data = JobReportData {
            context: test_support::context(),
            controls: vec![
                test_support::control(&job, "Guardrails on roof edge", true),
                test_support::control(&job, "Isolate overhead line", false),
            ],
            evidence: vec![test_support::evidence(&job)],
            attestations: vec![test_support::attestation(&job)],
            activity: test_support::ledger(job.organization_id, 40),
            job,
        };
        let bytes = render_job_report(&data).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_renders_empty_sections() {
        let job = test_support::job();
        let data = JobReportData {
            context: test_support::context(),
            controls: vec![],
            evidence: vec![],
            attestations: vec![],
            activity: vec![],
            job,
        };
        assert!(render_job_report(&data).unwrap().starts_with(b"%PDF"));
    }
}
