//! `riskmate inspect-pack` command implementation
//!
//! Prints what the manifest claims without checking it.

use std::path::Path;

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use riskmate_common::proof_pack::ProofPackManifest;

use super::OutputFormat;
use crate::error::Result;
use crate::pack::ProofPack;

pub fn run(path: &Path, format: OutputFormat) -> Result<()> {
    let pack = ProofPack::open(path)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pack.manifest)?),
        OutputFormat::Text => print_text(&pack.manifest),
    }
    Ok(())
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    match bytes {
        b if b >= KB * KB => format!("{:.1} MB", b as f64 / (KB * KB) as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

fn print_text(manifest: &ProofPackManifest) {
    println!("{}", "Proof Pack:".cyan().bold());
    println!("  Pack ID:      {}", manifest.pack_id);
    println!("  Organization: {}", manifest.organization_id);
    println!("  Job:          {}", optional(manifest.job_id));
    println!("  Generated:    {}", manifest.generated_at.to_rfc3339());
    println!("  Generated by: {}", manifest.generated_by);
    println!(
        "  Period:       {} to {}",
        optional(manifest.period.start.map(|t| t.to_rfc3339())),
        optional(manifest.period.end.map(|t| t.to_rfc3339()))
    );
    println!();

    let ledger = &manifest.ledger;
    println!("{}", "Ledger:".cyan().bold());
    println!("  Events:    {}", ledger.event_count);
    println!("  Sequence:  {} to {}", optional(ledger.first_seq), optional(ledger.last_seq));
    println!("  Head hash: {}", ledger.head_hash.as_deref().unwrap_or("-"));
    println!("  Integrity: {}", ledger.integrity);
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["File", "Size", "SHA-256"]);
    for file in &manifest.files {
        table.add_row(vec![file.name.clone(), format_bytes(file.size_bytes), file.sha256.clone()]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_optional_placeholder() {
        assert_eq!(optional::<i64>(None), "-");
        assert_eq!(optional(Some(7)), "7");
    }
}
