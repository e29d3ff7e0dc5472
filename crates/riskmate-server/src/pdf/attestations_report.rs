//! Attestations report: every sign-off in scope with its signature hash

use crate::features::attestations::AttestationRecord;

use super::layout::{PdfCanvas, SignatureLine};
use super::{format_time, PdfError, ReportContext};

#[derive(Debug, Clone)]
pub struct JobAttestations {
    pub job_title: String,
    pub attestations: Vec<AttestationRecord>,
}

#[derive(Debug, Clone)]
pub struct AttestationsReportData {
    pub context: ReportContext,
    pub jobs: Vec<JobAttestations>,
}

pub fn render_attestations_report(data: &AttestationsReportData) -> Result<Vec<u8>, PdfError> {
    let mut canvas = PdfCanvas::new("Attestations report", &data.context.footer())?;
    canvas.header_band("Attestations Report", "Signed statements of control verification");

    let total: usize = data.jobs.iter().map(|j| j.attestations.len()).sum();
    let invalid = data
        .jobs
        .iter()
        .flat_map(|j| &j.attestations)
        .filter(|a| !a.signature_is_valid())
        .count();

    let mut cover = data.context.cover_fields();
    cover.push(("Attestations", total.to_string()));
    cover.push((
        "Signature check",
        if invalid == 0 {
            "All signature hashes match their statements".to_string()
        } else {
            format!("{invalid} signature hash(es) do NOT match their statements")
        },
    ));
    canvas.key_values(&cover);

    if total == 0 {
        canvas.note("No attestations in scope.");
    }

    for entry in data.jobs.iter().filter(|j| !j.attestations.is_empty()) {
        canvas.heading(&entry.job_title);
        for attestation in &entry.attestations {
            canvas.paragraph(&format!("\"{}\"", attestation.statement));
            if !attestation.signature_is_valid() {
                canvas.note("Signature hash mismatch: statement or signer changed after signing.");
            }
            let signed_at = format_time(&attestation.signed_at);
            canvas.signature_block(&SignatureLine {
                name: &attestation.signer_name,
                title: &attestation.signer_title,
                signed_at: &signed_at,
                fingerprint: &attestation.signature_hash,
            });
        }
    }

    canvas.finish()
}
