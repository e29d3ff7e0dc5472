//! Controls report: mitigation status for each job in scope

use crate::features::controls::ControlRecord;
use crate::features::jobs::JobRecord;

use super::layout::{Column, PdfCanvas};
use super::{format_optional_time, PdfError, ReportContext};

#[derive(Debug, Clone)]
pub struct JobControls {
    pub job: JobRecord,
    pub controls: Vec<ControlRecord>,
}

#[derive(Debug, Clone)]
pub struct ControlsReportData {
    pub context: ReportContext,
    pub jobs: Vec<JobControls>,
}

/// Completed and total controls
pub fn completion(controls: &[ControlRecord]) -> (usize, usize) {
    let done = controls.iter().filter(|c| c.is_completed).count();
    (done, controls.len())
}

fn percent(done: usize, total: usize) -> String {
    if total == 0 {
        return "n/a".to_string();
    }
    format!("{}%", done * 100 / total)
}

pub fn render_controls_report(data: &ControlsReportData) -> Result<Vec<u8>, PdfError> {
    let mut canvas = PdfCanvas::new("Controls report", &data.context.footer())?;
    canvas.header_band("Controls Report", "Hazard mitigations and completion status");

    let (done, total) = data
        .jobs
        .iter()
        .map(|j| completion(&j.controls))
        .fold((0, 0), |(d, t), (jd, jt)| (d + jd, t + jt));

    let mut cover = data.context.cover_fields();
    cover.push(("Jobs", data.jobs.len().to_string()));
    cover.push(("Controls", format!("{done} of {total} completed ({})", percent(done, total))));
    canvas.key_values(&cover);

    if data.jobs.is_empty() {
        canvas.note("No jobs in scope.");
    }

    for entry in &data.jobs {
        let (job_done, job_total) = completion(&entry.controls);
        canvas.heading(&entry.job.title());
        canvas.note(&format!(
            "{} | risk {} ({}) | {} of {} controls completed",
            entry.job.location,
            entry.job.risk_score,
            entry.job.risk_level,
            job_done,
            job_total
        ));

        let rows: Vec<Vec<String>> = entry
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
            &rows,
        );
    }

    canvas.finish()
}
