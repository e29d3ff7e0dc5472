//! `riskmate verify-pack` command implementation

use std::path::Path;

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use tracing::info;

use super::OutputFormat;
use crate::error::Result;
use crate::pack::ProofPack;
use crate::verify::{verify_pack, CheckStatus, VerifyReport};

/// Verify a pack and print the report; returns whether it passed
pub fn run(path: &Path, format: OutputFormat) -> Result<bool> {
    let pack = ProofPack::open(path)?;
    let report = verify_pack(&pack);
    info!(
        pack_id = %report.pack_id,
        passed = report.passed,
        checks = report.checks.len(),
        "Proof pack verified"
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(path, &report),
    }

    Ok(report.passed)
}

fn print_text(path: &Path, report: &VerifyReport) {
    println!("{} {}", "Proof pack:".cyan().bold(), path.display());
    println!("  Pack ID: {}", report.pack_id);
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Check", "Result", "Detail"]);

    for check in &report.checks {
        let status = match check.status {
            CheckStatus::Pass => "PASS".green().to_string(),
            CheckStatus::Fail => "FAIL".red().bold().to_string(),
        };
        table.add_row(vec![check.name.clone(), status, check.detail.clone()]);
    }
    println!("{table}");
    println!();

    let failed = report.failures().count();
    if report.passed {
        println!("{}", "VERIFIED: every file and the ledger chain check out".green().bold());
    } else {
        println!(
            "{}",
            format!("NOT VERIFIED: {failed} of {} checks failed", report.checks.len())
                .red()
                .bold()
        );
    }
}
