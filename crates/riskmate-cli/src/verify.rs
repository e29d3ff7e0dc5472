//! Offline proof pack verification
//!
//! A pack passes when every listed file hashes to its manifest entry, no
//! unlisted file is present, the bundled ledger chain verifies, and the
//! ledger summary in the manifest matches the chain.

use riskmate_common::checksum::sha256_hex;
use riskmate_common::ledger::{
    verify_chain, verify_chain_from_genesis, ChainVerification, IntegrityStatus, LedgerRecord,
};
use riskmate_common::proof_pack::LEDGER_FILE;
use serde::Serialize;
use uuid::Uuid;

use crate::pack::ProofPack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pass,
            detail: detail.into(),
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            detail: detail.into(),
        }
    }

    fn expect(name: &str, ok: bool, pass: String, fail: String) -> Self {
        if ok {
            Self::pass(name, pass)
        } else {
            Self::fail(name, fail)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub pack_id: Uuid,
    pub passed: bool,
    pub checks: Vec<Check>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<ChainVerification>,
}

impl VerifyReport {
    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

fn file_checks(pack: &ProofPack) -> Vec<Check> {
    let mut checks: Vec<Check> = pack
        .manifest
        .files
        .iter()
        .map(|file| {
            let name = format!("file {}", file.name);
            let Some(data) = pack.entry(&file.name) else {
                return Check::fail(name, "listed in manifest but missing from archive");
            };
            let actual = sha256_hex(data);
            if actual != file.sha256 {
                Check::fail(
                    name,
                    format!(
                        "sha256 {} does not match manifest {}",
                        short(&actual),
                        short(&file.sha256)
                    ),
                )
            } else if data.len() as u64 != file.size_bytes {
                Check::fail(
                    name,
                    format!("{} bytes, manifest says {}", data.len(), file.size_bytes),
                )
            } else {
                Check::pass(name, format!("sha256 {}", short(&actual)))
            }
        })
        .collect();

    for extra in pack.payload_names().filter(|n| pack.manifest.file(n).is_none()) {
        checks.push(Check::fail(
            format!("file {extra}"),
            "present in archive but not listed in manifest",
        ));
    }
    checks
}

fn ledger_checks(
    pack: &ProofPack,
    records: &[LedgerRecord],
    verification: &ChainVerification,
) -> Vec<Check> {
    let summary = &pack.manifest.ledger;
    let chain_ok = matches!(verification.status, IntegrityStatus::Verified | IntegrityStatus::Empty);

    let chain = if chain_ok {
        Check::pass(
            "ledger chain",
            format!("{} events, hash chain intact", verification.events_checked),
        )
    } else {
        Check::fail(
            "ledger chain",
            format!(
                "broken at seq {}: {}",
                verification.broken_at_seq.map(|s| s.to_string()).unwrap_or_else(|| "?".into()),
                verification.reason.as_deref().unwrap_or("unknown reason")
            ),
        )
    };

    let count = records.len() as u64;
    let head = records.last().map(|r| r.hash.as_str());
    let first = records.first().map(|r| r.seq);
    let last = records.last().map(|r| r.seq);
    let foreign = records
        .iter()
        .filter(|r| r.organization_id != pack.manifest.organization_id)
        .count();

    vec![
        chain,
        Check::expect(
            "event count",
            count == summary.event_count,
            format!("{count} events"),
            format!("ledger has {count} events, manifest says {}", summary.event_count),
        ),
        Check::expect(
            "head hash",
            head == summary.head_hash.as_deref(),
            head.map(short).unwrap_or("none").to_string(),
            format!(
                "ledger head {} does not match manifest {}",
                head.map(short).unwrap_or("none"),
                summary.head_hash.as_deref().map(short).unwrap_or("none")
            ),
        ),
        Check::expect(
            "sequence range",
            first == summary.first_seq && last == summary.last_seq,
            format!("{:?}..={:?}", first, last),
            format!(
                "ledger covers {:?}..={:?}, manifest says {:?}..={:?}",
                first, last, summary.first_seq, summary.last_seq
            ),
        ),
        Check::expect(
            "recorded integrity",
            summary.integrity == verification.status,
            summary.integrity.to_string(),
            format!("manifest says {}, recomputed {}", summary.integrity, verification.status),
        ),
        Check::expect(
            "organization",
            foreign == 0,
            pack.manifest.organization_id.to_string(),
            format!("{foreign} events belong to another organization"),
        ),
    ]
}

/// Run every check against an opened pack
pub fn verify_pack(pack: &ProofPack) -> VerifyReport {
    let mut checks = file_checks(pack);

    let ledger = match pack.ledger() {
        Ok(records) => {
            // an unbounded pack must carry the ledger from seq 1
            let verification = match pack.manifest.period.start {
                Some(_) => verify_chain(&records),
                None => verify_chain_from_genesis(&records),
            };
            checks.extend(ledger_checks(pack, &records, &verification));
            Some(verification)
        },
        Err(err) => {
            checks.push(Check::fail(format!("file {LEDGER_FILE}"), format!("unreadable: {err}")));
            None
        },
    };

    let passed = checks.iter().all(|c| c.status == CheckStatus::Pass);
    VerifyReport {
        pack_id: pack.manifest.pack_id,
        passed,
        checks,
        ledger,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pack::test_support;
    use riskmate_common::proof_pack::PackFile;
    use std::io::Cursor;

    fn open(manifest: &riskmate_common::proof_pack::ProofPackManifest, payload: &[(String, Vec<u8>)]) -> ProofPack {
        ProofPack::from_reader(Cursor::new(test_support::zip(manifest, payload))).unwrap()
    }

    fn failed_names(report: &VerifyReport) -> Vec<String> {
        report.failures().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_intact_pack_passes() {
        let records = test_support::ledger(Uuid::new_v4(), 5);
        let (manifest, payload) = test_support::pack_parts(&records);
        let report = verify_pack(&open(&manifest, &payload));

        assert!(report.passed, "{:?}", failed_names(&report));
        assert!(report.ledger.unwrap().is_verified());
    }

    #[test]
    fn test_empty_ledger_passes() {
        let (manifest, payload) = test_support::pack_parts(&[]);
        let report = verify_pack(&open(&manifest, &payload));
        assert!(report.passed, "{:?}", failed_names(&report));
    }

    #[test]
    fn test_modified_file_fails() {
        let records = test_support::ledger(Uuid::new_v4(), 2);
        let (manifest, mut payload) = test_support::pack_parts(&records);
        payload[0].1 = b"%PDF-1.3 altered".to_vec();

        let report = verify_pack(&open(&manifest, &payload));
        assert!(!report.passed);
        assert_eq!(failed_names(&report), ["file controls.pdf"]);
    }

    #[test]
    fn test_unlisted_file_fails() {
        let records = test_support::ledger(Uuid::new_v4(), 2);
        let (manifest, mut payload) = test_support::pack_parts(&records);
        payload.push(("notes.txt".to_string(), b"added later".to_vec()));

        let report = verify_pack(&open(&manifest, &payload));
        assert_eq!(failed_names(&report), ["file notes.txt"]);
    }

    #[test]
    fn test_rewritten_ledger_with_rehashed_manifest_fails_chain() {
        let mut records = test_support::ledger(Uuid::new_v4(), 4);
        records[1].metadata = serde_json::json!({"seq": 99});
        let (mut manifest, payload) = test_support::pack_parts(&records);
        // a forger recomputes file hashes but cannot fix the chain
        manifest.ledger.integrity = IntegrityStatus::Verified;
        manifest.files = payload
            .iter()
            .map(|(name, data)| PackFile::from_bytes(name.clone(), data))
            .collect();

        let report = verify_pack(&open(&manifest, &payload));
        let failed = failed_names(&report);
        assert!(failed.contains(&"ledger chain".to_string()));
        assert!(failed.contains(&"recorded integrity".to_string()));
        assert_eq!(report.ledger.unwrap().broken_at_seq, Some(2));
    }

    #[test]
    fn test_unbounded_pack_missing_oldest_events_fails() {
        let records = test_support::ledger(Uuid::new_v4(), 5);
        let (manifest, payload) = test_support::pack_parts(&records[2..]);

        let report = verify_pack(&open(&manifest, &payload));
        let failed = failed_names(&report);
        assert!(failed.contains(&"ledger chain".to_string()), "{failed:?}");
        let ledger = report.ledger.unwrap();
        assert_eq!(ledger.status, IntegrityStatus::Tampered);
        assert_eq!(ledger.broken_at_seq, Some(3));
    }

    #[test]
    fn test_bounded_pack_may_start_mid_ledger() {
        let records = test_support::ledger(Uuid::new_v4(), 5);
        let (mut manifest, payload) = test_support::pack_parts(&records[2..]);
        manifest.period.start = Some(records[2].created_at);

        let report = verify_pack(&open(&manifest, &payload));
        assert!(report.passed, "{:?}", failed_names(&report));
        assert_eq!(report.ledger.unwrap().first_seq, Some(3));
    }

    #[test]
    fn test_summary_mismatch_fails() {
        let records = test_support::ledger(Uuid::new_v4(), 3);
        let (mut manifest, payload) = test_support::pack_parts(&records);
        manifest.ledger.event_count = 4;
        manifest.ledger.head_hash = Some("f".repeat(64));

        let report = verify_pack(&open(&manifest, &payload));
        assert_eq!(failed_names(&report), ["event count", "head hash"]);
    }

    #[test]
    fn test_report_json_shape() {
        let records = test_support::ledger(Uuid::new_v4(), 1);
        let (manifest, payload) = test_support::pack_parts(&records);
        let value = serde_json::to_value(verify_pack(&open(&manifest, &payload))).unwrap();
        assert_eq!(value["passed"], true);
        assert_eq!(value["checks"][0]["status"], "pass");
        assert_eq!(value["ledger"]["status"], "verified");
    }
}
