//! Destination for ledger events recorded outside a handler transaction

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::NewAuditEvent;
use super::queries::record_audit_log_pooled;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to write ledger event: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Records ledger events on behalf of middleware
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: NewAuditEvent) -> Result<(), AuditError>;
}

/// Writes events to Postgres, one transaction per event
#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, event: NewAuditEvent) -> Result<(), AuditError> {
        record_audit_log_pooled(&self.pool, event).await?;
        Ok(())
    }
}
