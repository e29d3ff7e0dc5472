//! Proof pack API routes (executive or higher)
//!
//! - `GET /api/v1/proof-packs/export` - Build, store and download a pack
//!   (`job_id`, `start_time`, `end_time`)
//! - `GET /api/v1/proof-packs` - Previously generated packs

use axum::{
    extract::{Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};

use super::commands::{self, PROOF_PACK_MIN_ROLE};
use super::queries;
use super::types::{ListProofPacksQuery, ProofPackScope};
use crate::api::response::{attachment, ApiResponse};
use crate::app::AppState;
use crate::error::ApiResult;
use crate::rbac::ActorContext;

/// Response header carrying the id of a freshly generated pack
pub const PACK_ID_HEADER: &str = "x-proof-pack-id";

pub fn proof_packs_routes() -> Router<AppState> {
    Router::new()
        .route("/proof-packs", get(list_packs))
        .route("/proof-packs/export", get(export_pack))
}

#[tracing::instrument(skip(state, actor), fields(user_id = %actor.user_id))]
async fn export_pack(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(scope): Query<ProofPackScope>,
) -> ApiResult<Response> {
    let pack = commands::generate::handle(&state.db, &state.storage, &actor, scope).await?;

    let file_name = format!(
        "proof-pack-{}.zip",
        pack.record.created_at.format("%Y%m%dT%H%M%SZ")
    );
    let mut response = attachment("application/zip", &file_name, pack.archive);
    if let Ok(value) = HeaderValue::from_str(&pack.record.id.to_string()) {
        response.headers_mut().insert(PACK_ID_HEADER, value);
    }
    Ok(response)
}

#[tracing::instrument(skip(state, actor))]
async fn list_packs(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<ListProofPacksQuery>,
) -> ApiResult<Response> {
    actor.require_role(PROOF_PACK_MIN_ROLE)?;
    let result = queries::list::handle(&state.db, actor.organization_id, query).await?;
    Ok(ApiResponse::success_with_meta(result.items, result.pagination.to_meta()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::{test_support::actor, Role};
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    async fn app_as(role: Role) -> Router {
        let state = crate::app::test_support::state().await;
        proof_packs_routes()
            .layer(Extension(actor(role)))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_proof_packs_require_executive() {
        for uri in ["/proof-packs", "/proof-packs/export"] {
            let response = app_as(Role::SafetyLead)
                .await
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_scope_rejected() {
        let response = app_as(Role::Executive)
            .await
            .oneshot(
                Request::get("/proof-packs/export?job_id=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
