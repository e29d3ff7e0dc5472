//! Audit ledger hashing and chain verification
//!
//! Every row of an organization's ledger carries the hash of the row before it.
//! The hash covers the previous hash, the sequence number and every classified
//! field of the event, so a modified, removed or reordered row breaks the chain
//! at the first affected sequence number.
//!
//! ```text
//! hash = SHA-256(prev_hash | seq | org | actor | actor_role | event_name |
//!                category | outcome | severity | target_type | target_id |
//!                created_at (RFC 3339, microseconds) | canonical metadata)
//! ```
//!
//! The server and the CLI both go through [`compute_record_hash`], so a proof
//! pack verified offline uses exactly the rules the writer used.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// `prev_hash` of the first event in every organization's ledger
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// The hashed portion of a ledger row plus its stored hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub seq: i64,
    pub organization_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<String>,
    pub event_name: String,
    pub category: String,
    pub outcome: String,
    pub severity: String,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub prev_hash: String,
    pub hash: String,
}

/// Result of checking a ledger or ledger segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    Verified,
    Tampered,
    Empty,
    #[default]
    NotVerified,
}

impl IntegrityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Tampered => "tampered",
            Self::Empty => "empty",
            Self::NotVerified => "not_verified",
        }
    }
}

impl std::fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary produced by [`ChainVerifier::finish`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub status: IntegrityStatus,
    pub events_checked: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_at_seq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChainVerification {
    pub fn is_verified(&self) -> bool {
        self.status == IntegrityStatus::Verified
    }
}

/// Compute the chained hash for a record, ignoring its stored `hash`
pub fn compute_record_hash(record: &LedgerRecord) -> String {
    let mut hasher = Sha256::new();
    let fields = [
        record.prev_hash.clone(),
        record.seq.to_string(),
        record.organization_id.to_string(),
        record.actor_id.map(|id| id.to_string()).unwrap_or_default(),
        record.actor_role.clone().unwrap_or_default(),
        record.event_name.clone(),
        record.category.clone(),
        record.outcome.clone(),
        record.severity.clone(),
        record.target_type.clone().unwrap_or_default(),
        record.target_id.map(|id| id.to_string()).unwrap_or_default(),
        format_timestamp(&record.created_at),
        canonical_json(&record.metadata),
    ];

    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(field.as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Timestamp rendering used inside the hash (microsecond precision, `Z` suffix)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serialize JSON with object keys sorted at every level
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::String((*key).clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(*key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        },
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        other => out.push_str(&other.to_string()),
    }
}

/// Incremental chain checker
///
/// Records must be pushed in ascending `seq` order. A segment that does not
/// start at seq 1 is anchored on the `prev_hash` of its first record, unless
/// the verifier was built with [`ChainVerifier::from_genesis`].
#[derive(Debug, Default)]
pub struct ChainVerifier {
    from_genesis: bool,
    checked: u64,
    first_seq: Option<i64>,
    last_seq: Option<i64>,
    last_hash: Option<String>,
    broken_at: Option<(i64, String)>,
}

impl ChainVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier for a whole ledger: the first record must be seq 1
    pub fn from_genesis() -> Self {
        Self {
            from_genesis: true,
            ..Self::default()
        }
    }

    /// Check one record. Returns `false` once the chain is broken; later
    /// records are ignored.
    pub fn push(&mut self, record: &LedgerRecord) -> bool {
        if self.broken_at.is_some() {
            return false;
        }

        if let Some(reason) = self.check(record) {
            self.broken_at = Some((record.seq, reason));
            return false;
        }

        self.checked += 1;
        self.first_seq.get_or_insert(record.seq);
        self.last_seq = Some(record.seq);
        self.last_hash = Some(record.hash.clone());
        true
    }

    fn check(&self, record: &LedgerRecord) -> Option<String> {
        match (self.last_seq, self.last_hash.as_deref()) {
            (Some(prev_seq), Some(prev_hash)) => {
                if record.seq != prev_seq + 1 {
                    return Some(format!(
                        "sequence gap: expected {}, found {}",
                        prev_seq + 1,
                        record.seq
                    ));
                }
                if record.prev_hash != prev_hash {
                    return Some("prev_hash does not match previous event hash".to_string());
                }
            },
            _ => {
                if record.seq < 1 {
                    return Some(format!("invalid sequence number {}", record.seq));
                }
                if self.from_genesis && record.seq != 1 {
                    return Some(format!(
                        "ledger starts at seq {}, events before it are missing",
                        record.seq
                    ));
                }
                if record.seq == 1 && record.prev_hash != GENESIS_HASH {
                    return Some("first event does not link to the genesis hash".to_string());
                }
            },
        }

        let computed = compute_record_hash(record);
        if computed != record.hash {
            return Some("stored hash does not match recomputed hash".to_string());
        }

        None
    }

    pub fn finish(self) -> ChainVerification {
        let status = match (&self.broken_at, self.checked) {
            (Some(_), _) => IntegrityStatus::Tampered,
            (None, 0) => IntegrityStatus::Empty,
            (None, _) => IntegrityStatus::Verified,
        };
        let (broken_at_seq, reason) = match self.broken_at {
            Some((seq, reason)) => (Some(seq), Some(reason)),
            None => (None, None),
        };

        ChainVerification {
            status,
            events_checked: self.checked,
            first_seq: self.first_seq,
            last_seq: self.last_seq,
            head_hash: self.last_hash,
            broken_at_seq,
            reason,
        }
    }
}

/// Verify a slice of records, anchored on its first `prev_hash`
pub fn verify_chain(records: &[LedgerRecord]) -> ChainVerification {
    run(ChainVerifier::new(), records)
}

/// Verify a slice that must hold the ledger from seq 1
pub fn verify_chain_from_genesis(records: &[LedgerRecord]) -> ChainVerification {
    run(ChainVerifier::from_genesis(), records)
}

fn run(mut verifier: ChainVerifier, records: &[LedgerRecord]) -> ChainVerification {
    for record in records {
        if !verifier.push(record) {
            break;
        }
    }
    verifier.finish()
}
