//! Reading proof pack archives

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use riskmate_common::ledger::LedgerRecord;
use riskmate_common::proof_pack::{ProofPackManifest, LEDGER_FILE, MANIFEST_FILE};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{CliError, Result};

/// Entries above this size are refused rather than inflated into memory
pub const MAX_ENTRY_BYTES: u64 = 512 * 1024 * 1024;

/// A proof pack read fully into memory
#[derive(Debug, Clone)]
pub struct ProofPack {
    pub manifest: ProofPackManifest,
    entries: BTreeMap<String, Vec<u8>>,
}

impl ProofPack {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = BTreeMap::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if file.size() > MAX_ENTRY_BYTES {
                return Err(CliError::EntryTooLarge {
                    name,
                    limit: MAX_ENTRY_BYTES,
                });
            }

            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            debug!(entry = %name, size = data.len(), "Read archive entry");
            entries.insert(name, data);
        }

        let manifest_bytes = entries
            .get(MANIFEST_FILE)
            .ok_or(CliError::MissingEntry(MANIFEST_FILE))?;
        let manifest = ProofPackManifest::from_json(manifest_bytes)?;

        Ok(Self { manifest, entries })
    }

    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Every entry except the manifest itself
    pub fn payload_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| *name != MANIFEST_FILE)
    }

    /// The ledger segment bundled in the pack
    pub fn ledger(&self) -> Result<Vec<LedgerRecord>> {
        let data = self
            .entry(LEDGER_FILE)
            .ok_or(CliError::MissingEntry(LEDGER_FILE))?;
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    use chrono::{Duration, TimeZone, Utc};
    use riskmate_common::ledger::{compute_record_hash, verify_chain, LedgerRecord, GENESIS_HASH};
    use riskmate_common::proof_pack::{
        LedgerSummary, PackFile, PackPeriod, ProofPackManifest, LEDGER_FILE, MANIFEST_FILE,
        MANIFEST_VERSION,
    };
    use serde_json::json;
    use uuid::Uuid;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub fn ledger(organization_id: Uuid, count: i64) -> Vec<LedgerRecord> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut prev = GENESIS_HASH.to_string();
        (1..=count)
            .map(|seq| {
                let mut record = LedgerRecord {
                    seq,
                    organization_id,
                    actor_id: Some(Uuid::new_v4()),
                    actor_role: Some("safety_lead".to_string()),
                    event_name: "control.completed".to_string(),
                    category: "operations".to_string(),
                    outcome: "success".to_string(),
                    severity: "info".to_string(),
                    target_type: Some("control".to_string()),
                    target_id: Some(Uuid::new_v4()),
                    metadata: json!({ "seq": seq }),
                    created_at: start + Duration::minutes(seq),
                    prev_hash: prev.clone(),
                    hash: String::new(),
                };
                record.hash = compute_record_hash(&record);
                prev = record.hash.clone();
                record
            })
            .collect()
    }

    /// A consistent manifest and payload for `records`
    pub fn pack_parts(records: &[LedgerRecord]) -> (ProofPackManifest, Vec<(String, Vec<u8>)>) {
        let organization_id = records
            .first()
            .map(|r| r.organization_id)
            .unwrap_or_else(Uuid::new_v4);
        let payload = vec![
            ("controls.pdf".to_string(), b"%PDF-1.3 controls".to_vec()),
            (LEDGER_FILE.to_string(), serde_json::to_vec_pretty(records).unwrap()),
        ];
        let verification = verify_chain(records);
        let manifest = ProofPackManifest {
            manifest_version: MANIFEST_VERSION,
            pack_id: Uuid::new_v4(),
            organization_id,
            job_id: None,
            generated_at: Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap(),
            generated_by: Uuid::new_v4(),
            period: PackPeriod {
                start: None,
                end: None,
            },
            ledger: LedgerSummary {
                event_count: records.len() as u64,
                first_seq: records.first().map(|r| r.seq),
                last_seq: records.last().map(|r| r.seq),
                head_hash: records.last().map(|r| r.hash.clone()),
                integrity: verification.status,
            },
            files: payload
                .iter()
                .map(|(name, data)| PackFile::from_bytes(name.clone(), data))
                .collect(),
        };
        (manifest, payload)
    }

    pub fn zip(manifest: &ProofPackManifest, payload: &[(String, Vec<u8>)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in payload {
            writer.start_file(name.as_str(), options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.start_file(MANIFEST_FILE, options).unwrap();
        writer.write_all(&manifest.to_json().unwrap()).unwrap();
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use uuid::Uuid;

    #[test]
    fn test_reads_manifest_and_ledger() {
        let records = test_support::ledger(Uuid::new_v4(), 3);
        let (manifest, payload) = test_support::pack_parts(&records);
        let pack = ProofPack::from_reader(Cursor::new(test_support::zip(&manifest, &payload))).unwrap();

        assert_eq!(pack.manifest, manifest);
        assert_eq!(pack.ledger().unwrap(), records);
        assert_eq!(pack.payload_names().collect::<Vec<_>>(), ["controls.pdf", LEDGER_FILE]);
    }

    #[test]
    fn test_missing_manifest() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("controls.pdf", zip::write::SimpleFileOptions::default())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = ProofPack::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, CliError::MissingEntry(MANIFEST_FILE)));
    }

    #[test]
    fn test_not_a_zip() {
        let err = ProofPack::from_reader(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, CliError::Archive(_)));
    }
}
