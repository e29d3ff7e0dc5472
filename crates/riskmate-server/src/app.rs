//! Application state and router assembly

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

use crate::audit::AuditSink;
use crate::config::{AuthConfig, CorsConfig, UploadConfig};
use crate::rbac::require_write_access;
use crate::storage::Storage;
use crate::{auth, features, middleware};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: Storage,
    pub auth: Arc<AuthConfig>,
    pub uploads: UploadConfig,
    /// Ledger writer for middleware that runs outside a handler transaction
    pub audit_sink: Arc<dyn AuditSink>,
}

/// Build the full router
///
/// Layers on `/api/v1` run outermost first: authentication, then the
/// read-only guard, then the handler.
pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    let api = features::router(&state.uploads)
        .layer(require_write_access(state.audit_sink.clone()))
        .layer(from_fn_with_state(state.clone(), auth::authenticate));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn health_check(State(state): State<AppState>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unreachable"
                })),
            )
                .into_response()
        },
    }
}
