//! Proof pack assembly
//!
//! Everything here is pure: the caller gathers rows, this module renders the
//! documents, hashes them into the manifest and writes the ZIP.

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use riskmate_common::ledger::{
    verify_chain, verify_chain_from_genesis, ChainVerification, LedgerRecord,
};
use riskmate_common::proof_pack::{
    LedgerSummary, PackFile, PackPeriod, ProofPackManifest, LEDGER_FILE, MANIFEST_FILE,
    MANIFEST_VERSION,
};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::audit::AuditEvent;
use crate::features::attestations::AttestationRecord;
use crate::features::controls::ControlRecord;
use crate::features::jobs::JobRecord;
use crate::pdf::{
    render_attestations_report, render_controls_report, render_ledger_export,
    AttestationsReportData, ControlsReportData, JobAttestations, JobControls, LedgerExportData,
    PdfError, ReportContext,
};

pub const LEDGER_EXPORT_FILE: &str = "ledger_export.pdf";
pub const CONTROLS_FILE: &str = "controls.pdf";
pub const ATTESTATIONS_FILE: &str = "attestations.pdf";

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error(transparent)]
    Render(#[from] PdfError),

    #[error("Failed to serialize pack contents: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write manifest: {0}")]
    Manifest(#[from] riskmate_common::RiskmateError),

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive entry: {0}")]
    Io(#[from] std::io::Error),
}

/// Rows a pack is built from
#[derive(Debug, Clone)]
pub struct PackContents {
    pub pack_id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Option<Uuid>,
    pub generated_by: Uuid,
    pub context: ReportContext,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    /// Contiguous ledger segment, ascending `ledger_seq`
    pub events: Vec<AuditEvent>,
    pub jobs: Vec<JobRecord>,
    pub controls: Vec<ControlRecord>,
    pub attestations: Vec<AttestationRecord>,
}

#[derive(Debug, Clone)]
pub struct BuiltPack {
    pub manifest: ProofPackManifest,
    pub verification: ChainVerification,
    pub archive: Vec<u8>,
}

/// Jobs shown in a section: the scoped job always, otherwise only jobs
/// that have at least one row
fn jobs_with<'a, T>(
    contents: &'a PackContents,
    rows: &'a [T],
    job_of: impl Fn(&T) -> Uuid + Copy + 'a,
) -> impl Iterator<Item = (&'a JobRecord, Vec<T>)> + 'a
where
    T: Clone,
{
    let scoped = contents.job_id;
    contents.jobs.iter().filter_map(move |job| {
        let owned: Vec<T> = rows.iter().filter(|&r| job_of(r) == job.id).cloned().collect();
        (scoped == Some(job.id) || !owned.is_empty()).then_some((job, owned))
    })
}

fn controls_report(contents: &PackContents) -> ControlsReportData {
    ControlsReportData {
        context: contents.context.clone(),
        jobs: jobs_with(contents, &contents.controls, |c: &ControlRecord| c.job_id)
            .map(|(job, controls)| JobControls {
                job: job.clone(),
                controls,
            })
            .collect(),
    }
}

fn attestations_report(contents: &PackContents) -> AttestationsReportData {
    AttestationsReportData {
        context: contents.context.clone(),
        jobs: jobs_with(contents, &contents.attestations, |a: &AttestationRecord| a.job_id)
            .map(|(job, attestations)| JobAttestations {
                job_title: job.title(),
                attestations,
            })
            .collect(),
    }
}

fn ledger_summary(records: &[LedgerRecord], verification: &ChainVerification) -> LedgerSummary {
    LedgerSummary {
        event_count: records.len() as u64,
        first_seq: records.first().map(|r| r.seq),
        last_seq: records.last().map(|r| r.seq),
        head_hash: records.last().map(|r| r.hash.clone()),
        integrity: verification.status,
    }
}

fn write_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>, PackError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (name, data) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(data)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Render, hash and zip a proof pack
pub fn build_pack(contents: &PackContents) -> Result<BuiltPack, PackError> {
    let records: Vec<LedgerRecord> =
        contents.events.iter().map(AuditEvent::to_ledger_record).collect();
    // without a start bound the segment is the ledger from its first event
    let verification = match contents.period_start {
        Some(_) => verify_chain(&records),
        None => verify_chain_from_genesis(&records),
    };

    let ledger_pdf = render_ledger_export(&LedgerExportData {
        context: contents.context.clone(),
        events: contents.events.clone(),
        verification: verification.clone(),
        period_start: contents.period_start,
        period_end: contents.period_end,
        job_id: contents.job_id,
    })?;
    let controls_pdf = render_controls_report(&controls_report(contents))?;
    let attestations_pdf = render_attestations_report(&attestations_report(contents))?;
    let ledger_json = serde_json::to_vec_pretty(&records)?;

    let payload: [(&str, &[u8]); 4] = [
        (LEDGER_EXPORT_FILE, ledger_pdf.as_slice()),
        (CONTROLS_FILE, controls_pdf.as_slice()),
        (ATTESTATIONS_FILE, attestations_pdf.as_slice()),
        (LEDGER_FILE, ledger_json.as_slice()),
    ];

    let manifest = ProofPackManifest {
        manifest_version: MANIFEST_VERSION,
        pack_id: contents.pack_id,
        organization_id: contents.organization_id,
        job_id: contents.job_id,
        generated_at: contents.context.generated_at,
        generated_by: contents.generated_by,
        period: PackPeriod {
            start: contents.period_start,
            end: contents.period_end,
        },
        ledger: ledger_summary(&records, &verification),
        files: payload
            .iter()
            .map(|(name, data)| PackFile::from_bytes(*name, data))
            .collect(),
    };
    let manifest_json = manifest.to_json()?;

    let mut entries = payload.to_vec();
    entries.push((MANIFEST_FILE, manifest_json.as_slice()));
    let archive = write_archive(&entries)?;

    Ok(BuiltPack {
        manifest,
        verification,
        archive,
    })
}
