//! Control API routes
//!
//! - `GET /api/v1/jobs/:id/controls` - List a job's controls
//! - `POST /api/v1/jobs/:id/controls` - Add a control
//! - `POST /api/v1/jobs/:id/controls/:control_id/complete` - Mark a control done

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use super::{commands, commands::CreateControlCommand, queries};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::error::ApiResult;
use crate::rbac::ActorContext;

pub fn controls_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/:id/controls", get(list_controls).post(create_control))
        .route("/jobs/:id/controls/:control_id/complete", post(complete_control))
}

#[tracing::instrument(skip(state, actor))]
async fn list_controls(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Response> {
    let controls = queries::list::handle(&state.db, actor.organization_id, job_id).await?;
    Ok(ApiResponse::success(controls).into_response())
}

#[tracing::instrument(skip(state, actor, command), fields(user_id = %actor.user_id))]
async fn create_control(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(job_id): Path<Uuid>,
    Json(command): Json<CreateControlCommand>,
) -> ApiResult<Response> {
    let control = commands::create::handle(&state.db, &actor, job_id, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(control))).into_response())
}

#[tracing::instrument(skip(state, actor), fields(user_id = %actor.user_id))]
async fn complete_control(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path((job_id, control_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    let control = commands::complete::handle(&state.db, &actor, job_id, control_id).await?;
    Ok(ApiResponse::success(control).into_response())
}
