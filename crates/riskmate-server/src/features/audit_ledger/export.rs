//! Ledger export encodings

use chrono::{DateTime, Utc};
use riskmate_common::ledger::format_timestamp;
use serde::{Deserialize, Serialize};

use crate::audit::AuditEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    pub fn file_name(&self, generated_at: &DateTime<Utc>) -> String {
        format!("ledger-{}.{}", generated_at.format("%Y%m%dT%H%M%SZ"), self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV buffer flush failed: {0}")]
    Flush(String),
}

const CSV_HEADER: [&str; 17] = [
    "ledger_seq",
    "created_at",
    "event_name",
    "action",
    "category",
    "outcome",
    "severity",
    "actor_id",
    "actor_role",
    "target_type",
    "target_id",
    "job_id",
    "ip_address",
    "user_agent",
    "metadata",
    "prev_hash",
    "hash",
];

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per event, timestamps in the same form the hash uses
pub fn encode_csv(events: &[AuditEvent]) -> Result<Vec<u8>, EncodeError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for e in events {
        writer.write_record([
            e.ledger_seq.to_string(),
            format_timestamp(&e.created_at),
            e.event_name.clone(),
            e.action.clone(),
            e.category.clone(),
            e.outcome.clone(),
            e.severity.clone(),
            opt(e.actor_id),
            opt(e.actor_role.as_deref()),
            opt(e.target_type.as_deref()),
            opt(e.target_id),
            opt(e.job_id),
            opt(e.ip_address.as_deref()),
            opt(e.user_agent.as_deref()),
            e.metadata.to_string(),
            e.prev_hash.clone(),
            e.hash.clone(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| EncodeError::Flush(e.to_string()))
}

pub fn encode_json(events: &[AuditEvent]) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec_pretty(events)?)
}

pub fn encode(format: ExportFormat, events: &[AuditEvent]) -> Result<Vec<u8>, EncodeError> {
    match format {
        ExportFormat::Csv => encode_csv(events),
        ExportFormat::Json => encode_json(events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support;

    #[test]
    fn test_csv_has_header_and_rows() {
        let events = test_support::ledger(uuid::Uuid::new_v4(), 3);
        let bytes = encode_csv(&events).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), CSV_HEADER.len());
        assert_eq!(&headers[0], "ledger_seq");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[2][0], "3");
        assert_eq!(&rows[2][16], events[2].hash);
    }

    #[test]
    fn test_json_round_trips_events() {
        let events = test_support::ledger(uuid::Uuid::new_v4(), 2);
        let parsed: Vec<AuditEvent> = serde_json::from_slice(&encode_json(&events).unwrap()).unwrap();
        assert_eq!(parsed[1].hash, events[1].hash);
    }

    #[test]
    fn test_format_defaults_and_names() {
        assert_eq!(ExportFormat::default(), ExportFormat::Csv);
        let at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 5, 6, 14, 0, 0).unwrap();
        assert_eq!(ExportFormat::Json.file_name(&at), "ledger-20240506T140000Z.json");
    }
}
