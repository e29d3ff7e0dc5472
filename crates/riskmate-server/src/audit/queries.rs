//! Database queries for the audit ledger
//!
//! Rows are only ever inserted. Each organization owns an independent hash
//! chain; writers serialize on a transaction-scoped advisory lock keyed by
//! the organization id, so `ledger_seq` stays contiguous under concurrency.

use chrono::{DateTime, SubsecRound, Utc};
use riskmate_common::ledger::{
    compute_record_hash, ChainVerification, ChainVerifier, LedgerRecord, GENESIS_HASH,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::classify::classify_with;
use super::models::{AuditEvent, AuditQuery, NewAuditEvent};

/// Rows fetched per round trip while verifying a ledger
pub const VERIFY_BATCH_SIZE: i64 = 1000;

const AUDIT_COLUMNS: &str = r#"
    id, organization_id, ledger_seq, actor_id, actor_role, event_name, action,
    category, outcome, severity, target_type, target_id, job_id, metadata,
    ip_address, user_agent, prev_hash, hash, created_at
"#;

#[derive(sqlx::FromRow)]
struct LedgerHead {
    ledger_seq: i64,
    hash: String,
}

/// Append an event to the organization's ledger inside the caller's transaction
///
/// The event commits or rolls back together with whatever the caller wrote.
pub async fn record_audit_log(
    conn: &mut PgConnection,
    event: NewAuditEvent,
) -> Result<AuditEvent, sqlx::Error> {
    let classification = classify_with(&event.event_name, event.outcome, event.severity);

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(event.organization_id.to_string())
        .execute(&mut *conn)
        .await?;

    let head = sqlx::query_as::<_, LedgerHead>(
        r#"
        SELECT ledger_seq, hash
        FROM audit_logs
        WHERE organization_id = $1
        ORDER BY ledger_seq DESC
        LIMIT 1
        "#,
    )
    .bind(event.organization_id)
    .fetch_optional(&mut *conn)
    .await?;

    let (seq, prev_hash) = match head {
        Some(head) => (head.ledger_seq + 1, head.hash),
        None => (1, GENESIS_HASH.to_string()),
    };

    // Postgres stores microseconds; hash exactly what will be read back.
    let created_at: DateTime<Utc> = Utc::now().trunc_subsecs(6);

    let mut record = LedgerRecord {
        seq,
        organization_id: event.organization_id,
        actor_id: event.actor_id,
        actor_role: event.actor_role.clone(),
        event_name: event.event_name.clone(),
        category: classification.category.as_str().to_string(),
        outcome: classification.outcome.as_str().to_string(),
        severity: classification.severity.as_str().to_string(),
        target_type: event.target_type.clone(),
        target_id: event.target_id,
        metadata: event.metadata.clone(),
        created_at,
        prev_hash,
        hash: String::new(),
    };
    record.hash = compute_record_hash(&record);

    let sql = format!(
        r#"
        INSERT INTO audit_logs (
            organization_id, ledger_seq, actor_id, actor_role, event_name, action,
            category, outcome, severity, target_type, target_id, job_id, metadata,
            ip_address, user_agent, prev_hash, hash, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING {AUDIT_COLUMNS}
        "#
    );

    let stored = sqlx::query_as::<_, AuditEvent>(&sql)
        .bind(record.organization_id)
        .bind(record.seq)
        .bind(record.actor_id)
        .bind(&record.actor_role)
        .bind(&record.event_name)
        .bind(&classification.action)
        .bind(&record.category)
        .bind(&record.outcome)
        .bind(&record.severity)
        .bind(&record.target_type)
        .bind(record.target_id)
        .bind(event.job_id)
        .bind(&record.metadata)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&record.prev_hash)
        .bind(&record.hash)
        .bind(record.created_at)
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        organization_id = %stored.organization_id,
        ledger_seq = stored.ledger_seq,
        event_name = %stored.event_name,
        severity = %stored.severity,
        "Recorded ledger event"
    );

    Ok(stored)
}

/// Append an event in its own transaction
pub async fn record_audit_log_pooled(
    pool: &PgPool,
    event: NewAuditEvent,
) -> Result<AuditEvent, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let stored = record_audit_log(&mut *tx, event).await?;
    tx.commit().await?;
    Ok(stored)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, org: Uuid, query: &AuditQuery) {
    builder.push(" WHERE organization_id = ").push_bind(org);

    if let Some(category) = query.category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(outcome) = query.outcome {
        builder.push(" AND outcome = ").push_bind(outcome.as_str());
    }
    if let Some(severity) = query.severity {
        builder.push(" AND severity = ").push_bind(severity.as_str());
    }
    if let Some(event_name) = &query.event_name {
        builder.push(" AND event_name = ").push_bind(event_name.clone());
    }
    if let Some(actor_id) = query.actor_id {
        builder.push(" AND actor_id = ").push_bind(actor_id);
    }
    if let Some(job_id) = query.job_id {
        builder.push(" AND job_id = ").push_bind(job_id);
    }
    if let Some(target_id) = query.target_id {
        builder.push(" AND target_id = ").push_bind(target_id);
    }
    if let Some(start_time) = query.start_time {
        builder.push(" AND created_at >= ").push_bind(start_time);
    }
    if let Some(end_time) = query.end_time {
        builder.push(" AND created_at <= ").push_bind(end_time);
    }
}

/// List ledger events for an organization, newest first
pub async fn query_audit_logs(
    pool: &PgPool,
    organization_id: Uuid,
    query: &AuditQuery,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs"));
    push_filters(&mut builder, organization_id, query);
    builder
        .push(" ORDER BY ledger_seq DESC LIMIT ")
        .push_bind(query.effective_limit())
        .push(" OFFSET ")
        .push_bind(query.effective_offset());

    let records = builder.build_query_as::<AuditEvent>().fetch_all(pool).await?;

    debug!(
        organization_id = %organization_id,
        count = records.len(),
        "Queried ledger events"
    );

    Ok(records)
}

/// Count ledger events matching the filters (limit/offset ignored)
pub async fn count_audit_logs(
    pool: &PgPool,
    organization_id: Uuid,
    query: &AuditQuery,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
    push_filters(&mut builder, organization_id, query);

    let (count,): (i64,) = builder.build_query_as().fetch_one(pool).await?;
    Ok(count)
}

/// Contiguous ledger segment covering `[start, end]`, in seq order
///
/// Filtering by job would leave holes in the chain, so the segment always
/// spans every event of the organization within the period. The window is
/// resolved to its lowest and highest `ledger_seq` first: `created_at` comes
/// from the writer's clock and is not guaranteed to follow seq order.
pub async fn ledger_segment(
    pool: &PgPool,
    organization_id: Uuid,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs"));
    builder.push(" WHERE organization_id = ").push_bind(organization_id);

    if start.is_some() || end.is_some() {
        let Some((first, last)) = segment_bounds(pool, organization_id, start, end).await? else {
            return Ok(Vec::new());
        };
        builder
            .push(" AND ledger_seq BETWEEN ")
            .push_bind(first)
            .push(" AND ")
            .push_bind(last);
    }
    builder.push(" ORDER BY ledger_seq ASC");

    builder.build_query_as::<AuditEvent>().fetch_all(pool).await
}

/// First and last seq of the events timestamped inside the window
async fn segment_bounds(
    pool: &PgPool,
    organization_id: Uuid,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Option<(i64, i64)>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT MIN(ledger_seq), MAX(ledger_seq) FROM audit_logs WHERE organization_id = ",
    );
    builder.push_bind(organization_id);
    if let Some(start) = start {
        builder.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = end {
        builder.push(" AND created_at <= ").push_bind(end);
    }

    let (first, last) = builder
        .build_query_as::<(Option<i64>, Option<i64>)>()
        .fetch_one(pool)
        .await?;
    Ok(first.zip(last))
}

/// Walk the organization's full ledger and check every link
///
/// The walk must begin at seq 1, so removed leading events are reported.
#[tracing::instrument(skip(pool))]
pub async fn verify_ledger(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<ChainVerification, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {AUDIT_COLUMNS}
        FROM audit_logs
        WHERE organization_id = $1 AND ledger_seq > $2
        ORDER BY ledger_seq ASC
        LIMIT $3
        "#
    );

    let mut verifier = ChainVerifier::from_genesis();
    let mut after_seq = 0i64;

    'batches: loop {
        let batch = sqlx::query_as::<_, AuditEvent>(&sql)
            .bind(organization_id)
            .bind(after_seq)
            .bind(VERIFY_BATCH_SIZE)
            .fetch_all(pool)
            .await?;

        let fetched = batch.len() as i64;
        for event in &batch {
            if !verifier.push(&event.to_ledger_record()) {
                break 'batches;
            }
            after_seq = event.ledger_seq;
        }

        if fetched < VERIFY_BATCH_SIZE {
            break;
        }
    }

    let result = verifier.finish();
    match result.broken_at_seq {
        None => info!(
            organization_id = %organization_id,
            status = %result.status,
            events_checked = result.events_checked,
            "Ledger verification finished"
        ),
        Some(seq) => warn!(
            organization_id = %organization_id,
            broken_at_seq = seq,
            reason = ?result.reason,
            "Ledger verification found a broken link"
        ),
    }

    Ok(result)
}
