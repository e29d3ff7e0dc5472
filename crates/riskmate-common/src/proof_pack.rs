//! Proof pack manifest
//!
//! A proof pack is a ZIP archive handed to insurers and auditors. The manifest
//! lists every other file in the archive with its SHA-256 and summarizes the
//! ledger segment the pack was derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checksum::sha256_hex;
use crate::error::{Result, RiskmateError};
use crate::ledger::IntegrityStatus;

/// File name of the manifest inside the archive
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the raw ledger segment inside the archive
pub const LEDGER_FILE: &str = "ledger.json";

/// Current manifest layout version
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofPackManifest {
    pub manifest_version: u32,
    pub pack_id: Uuid,
    pub organization_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Uuid,
    pub period: PackPeriod,
    pub ledger: LedgerSummary,
    pub files: Vec<PackFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackPeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub event_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_hash: Option<String>,
    pub integrity: IntegrityStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackFile {
    pub name: String,
    pub sha256: String,
    pub size_bytes: u64,
}

impl PackFile {
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Self {
        Self {
            name: name.into(),
            sha256: sha256_hex(data),
            size_bytes: data.len() as u64,
        }
    }
}

impl ProofPackManifest {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(data)?;
        if manifest.manifest_version != MANIFEST_VERSION {
            return Err(RiskmateError::invalid_pack(format!(
                "unsupported manifest version {}",
                manifest.manifest_version
            )));
        }
        Ok(manifest)
    }

    pub fn file(&self, name: &str) -> Option<&PackFile> {
        self.files.iter().find(|f| f.name == name)
    }
}
