//! Deterministic event classification
//!
//! Every ledger row carries an action, category, outcome and severity that
//! are derived purely from the event name, so the same name always lands in
//! the same bucket regardless of which code path recorded it.

use super::models::{AuditCategory, AuditOutcome, AuditSeverity, Classification};

const ACCESS_PREFIXES: &[&str] = &["auth", "team", "access", "role"];
const OPERATIONS_PREFIXES: &[&str] = &["job", "hazard", "control", "mitigation", "site"];
const EVIDENCE_PREFIXES: &[&str] = &["evidence", "document", "attestation", "photo"];
const GOVERNANCE_PREFIXES: &[&str] = &["proof_pack", "report", "export", "ledger"];

const BLOCKED_MARKERS: &[&str] = &["violation", "denied", "blocked"];
const FAILURE_MARKERS: &[&str] = &["failed", "error"];

/// Actions that change the standing of a record and are always material
const MATERIAL_ACTIONS: &[&str] = &[
    "deleted",
    "archived",
    "removed",
    "role_changed",
    "signed",
    "flagged",
    "revoked",
];

/// Classify an event name such as `job.created` or `auth.role_violation`
pub fn classify(event_name: &str) -> Classification {
    let name = event_name.trim().to_lowercase();
    let action = derive_action(&name);
    let category = derive_category(&name);
    let outcome = derive_outcome(&name);
    let severity = derive_severity(outcome, &action);

    Classification {
        action,
        category,
        outcome,
        severity,
    }
}

/// Classify and then apply explicit overrides
///
/// An outcome override also re-derives severity unless severity is
/// overridden as well.
pub fn classify_with(
    event_name: &str,
    outcome: Option<AuditOutcome>,
    severity: Option<AuditSeverity>,
) -> Classification {
    let mut classification = classify(event_name);
    if let Some(outcome) = outcome {
        classification.outcome = outcome;
        classification.severity = derive_severity(outcome, &classification.action);
    }
    if let Some(severity) = severity {
        classification.severity = severity;
    }
    classification
}

fn derive_action(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, action)) if !action.is_empty() => action.to_string(),
        _ => name.to_string(),
    }
}

fn derive_category(name: &str) -> AuditCategory {
    let prefix = name.split('.').next().unwrap_or_default();

    if ACCESS_PREFIXES.contains(&prefix) {
        AuditCategory::Access
    } else if OPERATIONS_PREFIXES.contains(&prefix) {
        AuditCategory::Operations
    } else if EVIDENCE_PREFIXES.contains(&prefix) {
        AuditCategory::Evidence
    } else if GOVERNANCE_PREFIXES.contains(&prefix) {
        AuditCategory::Governance
    } else {
        AuditCategory::System
    }
}

fn derive_outcome(name: &str) -> AuditOutcome {
    if BLOCKED_MARKERS.iter().any(|m| name.contains(m)) {
        AuditOutcome::Blocked
    } else if FAILURE_MARKERS.iter().any(|m| name.contains(m)) {
        AuditOutcome::Failure
    } else {
        AuditOutcome::Success
    }
}

fn derive_severity(outcome: AuditOutcome, action: &str) -> AuditSeverity {
    match outcome {
        AuditOutcome::Blocked => AuditSeverity::Critical,
        AuditOutcome::Failure => AuditSeverity::Material,
        AuditOutcome::Success if MATERIAL_ACTIONS.contains(&action) => AuditSeverity::Material,
        AuditOutcome::Success => AuditSeverity::Info,
    }
}
