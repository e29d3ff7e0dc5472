//! Audit ledger API routes (executive or higher)
//!
//! - `GET /api/v1/audit/events` - Filtered event list, newest first
//! - `GET /api/v1/audit/verify` - Walk the hash chain
//! - `GET /api/v1/audit/export?format=csv|json` - Download the ledger

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::export::{encode, ExportFormat};
use crate::api::response::{attachment, ApiResponse};
use crate::app::AppState;
use crate::audit::{
    count_audit_logs, ledger_segment, query_audit_logs, record_audit_log_pooled, verify_ledger,
    AuditQuery, NewAuditEvent,
};
use crate::error::{ApiResult, AppError};
use crate::rbac::{ActorContext, Role};

/// Lowest role allowed to read the ledger
pub const LEDGER_MIN_ROLE: Role = Role::Executive;

pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/audit/events", get(list_events))
        .route("/audit/verify", get(verify))
        .route("/audit/export", get(export))
}

#[tracing::instrument(skip(state, actor, query))]
async fn list_events(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Response> {
    actor.require_role(LEDGER_MIN_ROLE)?;

    let events = query_audit_logs(&state.db, actor.organization_id, &query).await?;
    let total = count_audit_logs(&state.db, actor.organization_id, &query).await?;

    let meta = json!({
        "total": total,
        "limit": query.effective_limit(),
        "offset": query.effective_offset(),
        "has_more": query.effective_offset() + (events.len() as i64) < total,
    });
    Ok(ApiResponse::success_with_meta(events, meta).into_response())
}

#[tracing::instrument(skip(state, actor))]
async fn verify(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Response> {
    actor.require_role(LEDGER_MIN_ROLE)?;

    let verification = verify_ledger(&state.db, actor.organization_id).await?;

    let event_name = if verification.broken_at_seq.is_some() {
        "ledger.verification_failed"
    } else {
        "ledger.verified"
    };
    record_audit_log_pooled(
        &state.db,
        NewAuditEvent::for_actor(&actor, event_name)
            .metadata(json!({
                "status": verification.status,
                "events_checked": verification.events_checked,
                "head_hash": verification.head_hash,
                "broken_at_seq": verification.broken_at_seq,
                "reason": verification.reason,
            }))
            .build(),
    )
    .await?;

    Ok(ApiResponse::success(verification).into_response())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[tracing::instrument(skip(state, actor))]
async fn export(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    actor.require_role(LEDGER_MIN_ROLE)?;
    if let (Some(start), Some(end)) = (params.start_time, params.end_time) {
        if end < start {
            return Err(AppError::Validation("end_time cannot be before start_time".into()));
        }
    }

    let events = ledger_segment(
        &state.db,
        actor.organization_id,
        params.start_time,
        params.end_time,
    )
    .await?;
    let body = encode(params.format, &events).map_err(|e| AppError::Internal(e.to_string()))?;

    let export_id = Uuid::new_v4();
    record_audit_log_pooled(
        &state.db,
        NewAuditEvent::for_actor(&actor, "export.ledger")
            .target("ledger_export", export_id)
            .metadata(json!({
                "format": params.format.as_str(),
                "event_count": events.len(),
                "first_seq": events.first().map(|e| e.ledger_seq),
                "last_seq": events.last().map(|e| e.ledger_seq),
                "start_time": params.start_time,
                "end_time": params.end_time,
            }))
            .build(),
    )
    .await?;

    tracing::info!(
        format = params.format.as_str(),
        events = events.len(),
        "Ledger exported"
    );

    let file_name = params.format.file_name(&Utc::now());
    Ok(attachment(params.format.content_type(), &file_name, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::test_support::actor;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    async fn app_as(role: Role) -> Router {
        let state = crate::app::test_support::state().await;
        audit_routes()
            .layer(Extension(actor(role)))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_members_cannot_read_ledger() {
        for uri in ["/audit/events", "/audit/verify", "/audit/export?format=json"] {
            let response = app_as(Role::SafetyLead)
                .await
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_unknown_export_format_rejected() {
        let response = app_as(Role::Executive)
            .await
            .oneshot(Request::get("/audit/export?format=xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_export_params_default_to_csv() {
        let params: ExportParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.format, ExportFormat::Csv);
    }
}
