//! Attestation API routes
//!
//! - `GET /api/v1/jobs/:id/attestations` - List sign-offs on a job
//! - `POST /api/v1/jobs/:id/attestations` - Sign off (safety lead or higher)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use super::{commands, commands::SignAttestationCommand, queries};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::error::ApiResult;
use crate::rbac::ActorContext;

pub fn attestations_routes() -> Router<AppState> {
    Router::new().route(
        "/jobs/:id/attestations",
        get(list_attestations).post(sign_attestation),
    )
}

#[tracing::instrument(skip(state, actor))]
async fn list_attestations(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Response> {
    let attestations = queries::list::handle(&state.db, actor.organization_id, job_id).await?;
    Ok(ApiResponse::success(attestations).into_response())
}

#[tracing::instrument(skip(state, actor, command), fields(user_id = %actor.user_id))]
async fn sign_attestation(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(job_id): Path<Uuid>,
    Json(command): Json<SignAttestationCommand>,
) -> ApiResult<Response> {
    let record = commands::sign::handle(&state.db, &actor, job_id, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))).into_response())
}
