//! Audit ledger data models

use chrono::{DateTime, Utc};
use riskmate_common::ledger::LedgerRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::rbac::ActorContext;

// ============================================================================
// Audit Query Constants
// ============================================================================

/// Default number of ledger events returned per query
pub const DEFAULT_AUDIT_QUERY_LIMIT: i64 = 100;

/// Maximum number of ledger events that can be returned in a single query.
pub const MAX_AUDIT_QUERY_LIMIT: i64 = 1000;

/// Broad area of the product an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Access,
    Operations,
    Evidence,
    Governance,
    System,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Operations => "operations",
            Self::Evidence => "evidence",
            Self::Governance => "governance",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Blocked,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Material,
    Critical,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Material => "material",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields derived from an event name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub action: String,
    pub category: AuditCategory,
    pub outcome: AuditOutcome,
    pub severity: AuditSeverity,
}

/// A ledger event waiting to be written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEvent {
    pub organization_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<String>,
    pub event_name: String,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub metadata: JsonValue,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub outcome: Option<AuditOutcome>,
    pub severity: Option<AuditSeverity>,
}

impl NewAuditEvent {
    /// Create a builder for an event in `organization_id`
    pub fn builder(organization_id: Uuid, event_name: impl Into<String>) -> NewAuditEventBuilder {
        NewAuditEventBuilder::new(organization_id, event_name)
    }

    /// Builder pre-filled with the caller's identity and client details
    pub fn for_actor(actor: &ActorContext, event_name: impl Into<String>) -> NewAuditEventBuilder {
        NewAuditEventBuilder::new(actor.organization_id, event_name)
            .actor(actor.user_id, actor.role.as_str())
            .ip_address(actor.ip_address.clone())
            .user_agent(actor.user_agent.clone())
    }
}

/// Builder for [`NewAuditEvent`]
#[derive(Debug, Clone)]
pub struct NewAuditEventBuilder {
    event: NewAuditEvent,
}

impl NewAuditEventBuilder {
    pub fn new(organization_id: Uuid, event_name: impl Into<String>) -> Self {
        Self {
            event: NewAuditEvent {
                organization_id,
                actor_id: None,
                actor_role: None,
                event_name: event_name.into(),
                target_type: None,
                target_id: None,
                job_id: None,
                metadata: JsonValue::Object(serde_json::Map::new()),
                ip_address: None,
                user_agent: None,
                outcome: None,
                severity: None,
            },
        }
    }

    pub fn actor(mut self, actor_id: Uuid, role: impl Into<String>) -> Self {
        self.event.actor_id = Some(actor_id);
        self.event.actor_role = Some(role.into());
        self
    }

    pub fn target(mut self, target_type: impl Into<String>, target_id: Uuid) -> Self {
        self.event.target_type = Some(target_type.into());
        self.event.target_id = Some(target_id);
        self
    }

    pub fn job(mut self, job_id: Uuid) -> Self {
        self.event.job_id = Some(job_id);
        self
    }

    /// Replace metadata; anything but a JSON object is wrapped as `{"value": ..}`
    pub fn metadata(mut self, metadata: JsonValue) -> Self {
        self.event.metadata = match metadata {
            JsonValue::Object(_) => metadata,
            JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
            other => serde_json::json!({ "value": other }),
        };
        self
    }

    pub fn ip_address(mut self, ip: Option<String>) -> Self {
        self.event.ip_address = ip;
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.event.user_agent = user_agent;
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.event.outcome = Some(outcome);
        self
    }

    pub fn severity(mut self, severity: AuditSeverity) -> Self {
        self.event.severity = Some(severity);
        self
    }

    pub fn build(self) -> NewAuditEvent {
        self.event
    }
}

/// Ledger row as stored in `audit_logs`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEvent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ledger_seq: i64,
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<String>,
    pub event_name: String,
    pub action: String,
    pub category: String,
    pub outcome: String,
    pub severity: String,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub metadata: JsonValue,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub prev_hash: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// The hashed subset of the row
    pub fn to_ledger_record(&self) -> LedgerRecord {
        LedgerRecord {
            seq: self.ledger_seq,
            organization_id: self.organization_id,
            actor_id: self.actor_id,
            actor_role: self.actor_role.clone(),
            event_name: self.event_name.clone(),
            category: self.category.clone(),
            outcome: self.outcome.clone(),
            severity: self.severity.clone(),
            target_type: self.target_type.clone(),
            target_id: self.target_id,
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            prev_hash: self.prev_hash.clone(),
            hash: self.hash.clone(),
        }
    }
}

/// Ledger listing filters
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    pub category: Option<AuditCategory>,
    pub outcome: Option<AuditOutcome>,
    pub severity: Option<AuditSeverity>,
    pub event_name: Option<String>,
    pub actor_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_AUDIT_QUERY_LIMIT
}

impl AuditQuery {
    /// Limit clamped to `1..=MAX_AUDIT_QUERY_LIMIT`
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_AUDIT_QUERY_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            category: None,
            outcome: None,
            severity: None,
            event_name: None,
            actor_id: None,
            job_id: None,
            target_id: None,
            start_time: None,
            end_time: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::{test_support, Role};

    #[test]
    fn test_for_actor_prefills_identity() {
        let actor = test_support::actor(Role::SafetyLead);
        let job_id = Uuid::new_v4();
        let event = NewAuditEvent::for_actor(&actor, "job.updated")
            .target("job", job_id)
            .job(job_id)
            .metadata(serde_json::json!({"from": "planned", "to": "active"}))
            .build();

        assert_eq!(event.organization_id, actor.organization_id);
        assert_eq!(event.actor_id, Some(actor.user_id));
        assert_eq!(event.actor_role.as_deref(), Some("safety_lead"));
        assert_eq!(event.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(event.target_type.as_deref(), Some("job"));
        assert_eq!(event.metadata["to"], "active");
    }

    #[test]
    fn test_non_object_metadata_is_wrapped() {
        let event = NewAuditEvent::builder(Uuid::new_v4(), "system.note")
            .metadata(serde_json::json!([1, 2]))
            .build();
        assert_eq!(event.metadata, serde_json::json!({"value": [1, 2]}));

        let event = NewAuditEvent::builder(Uuid::new_v4(), "system.note")
            .metadata(JsonValue::Null)
            .build();
        assert_eq!(event.metadata, serde_json::json!({}));
    }

    #[test]
    fn test_query_limits_are_clamped() {
        let query = AuditQuery {
            limit: 50_000,
            offset: -3,
            ..Default::default()
        };
        assert_eq!(query.effective_limit(), MAX_AUDIT_QUERY_LIMIT);
        assert_eq!(query.effective_offset(), 0);

        let query = AuditQuery {
            limit: 0,
            ..Default::default()
        };
        assert_eq!(query.effective_limit(), 1);
        assert_eq!(AuditQuery::default().effective_limit(), DEFAULT_AUDIT_QUERY_LIMIT);
    }

    #[test]
    fn test_query_deserializes_enum_filters() {
        let query: AuditQuery =
            serde_json::from_str(r#"{"category":"governance","severity":"critical"}"#).unwrap();
        assert_eq!(query.category, Some(AuditCategory::Governance));
        assert_eq!(query.severity, Some(AuditSeverity::Critical));
        assert_eq!(query.limit, DEFAULT_AUDIT_QUERY_LIMIT);
    }
}
