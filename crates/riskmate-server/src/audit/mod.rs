//! Audit ledger
//!
//! Every material change in Riskmate is written to `audit_logs`, an
//! append-only, per-organization hash chain. The ledger is the source for
//! compliance exports and proof packs.
//!
//! # Architecture
//!
//! - **Classification**: category, outcome, severity and action are derived
//!   from the event name ([`classify`]), never supplied ad hoc
//! - **Writes**: [`record_audit_log`] runs inside the caller's transaction so
//!   an event and the change it describes commit together
//! - **Middleware writes**: [`AuditSink`] for code that has no transaction of
//!   its own, such as the read-only role guard
//! - **Verification**: [`verify_ledger`] re-hashes the chain in seq order
//!
//! # Example
//!
//! ```no_run
//! use riskmate_server::audit::{record_audit_log, NewAuditEvent};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: &PgPool, org: Uuid, job: Uuid) -> Result<(), sqlx::Error> {
//! let mut tx = pool.begin().await?;
//! // ... write the job change ...
//! let event = NewAuditEvent::builder(org, "job.archived")
//!     .target("job", job)
//!     .job(job)
//!     .build();
//! record_audit_log(&mut *tx, event).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

mod classify;
mod models;
mod queries;
mod sink;

pub use classify::{classify, classify_with};
pub use models::{
    AuditCategory, AuditEvent, AuditOutcome, AuditQuery, AuditSeverity, Classification,
    NewAuditEvent, NewAuditEventBuilder, DEFAULT_AUDIT_QUERY_LIMIT, MAX_AUDIT_QUERY_LIMIT,
};
pub use queries::{
    count_audit_logs, ledger_segment, query_audit_logs, record_audit_log,
    record_audit_log_pooled, verify_ledger, VERIFY_BATCH_SIZE,
};
pub use sink::{AuditError, AuditSink, PgAuditSink};

#[cfg(test)]
pub(crate) use sink::test_support;
