//! Job API routes
//!
//! - `POST /api/v1/jobs` - Create a job
//! - `GET /api/v1/jobs` - List jobs (`status`, `risk_level`, `include_archived`, `page`, `per_page`)
//! - `GET /api/v1/jobs/:id` - Get a job
//! - `PATCH /api/v1/jobs/:id` - Update a job
//! - `POST /api/v1/jobs/:id/archive` - Archive a job (safety lead or higher)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use super::{
    commands::{self, CreateJobCommand, UpdateJobCommand},
    queries::{self, ListJobsQuery},
};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::error::ApiResult;
use crate::rbac::ActorContext;

pub fn jobs_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/:id", get(get_job).patch(update_job))
        .route("/jobs/:id/archive", post(archive_job))
}

#[tracing::instrument(skip(state, actor, command), fields(user_id = %actor.user_id))]
async fn create_job(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(command): Json<CreateJobCommand>,
) -> ApiResult<Response> {
    let job = commands::create::handle(&state.db, &actor, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(job))).into_response())
}

#[tracing::instrument(skip(state, actor))]
async fn list_jobs(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Response> {
    let result = queries::list::handle(&state.db, actor.organization_id, query).await?;
    Ok(ApiResponse::success_with_meta(result.items, result.pagination.to_meta()).into_response())
}

#[tracing::instrument(skip(state, actor))]
async fn get_job(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let job = queries::get::handle(&state.db, actor.organization_id, id).await?;
    Ok(ApiResponse::success(job).into_response())
}

#[tracing::instrument(skip(state, actor, command), fields(user_id = %actor.user_id))]
async fn update_job(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
    Json(command): Json<UpdateJobCommand>,
) -> ApiResult<Response> {
    let job = commands::update::handle(&state.db, &actor, id, command).await?;
    Ok(ApiResponse::success(job).into_response())
}

#[tracing::instrument(skip(state, actor), fields(user_id = %actor.user_id))]
async fn archive_job(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let response = commands::archive::handle(&state.db, &actor, id).await?;
    Ok(ApiResponse::success(response).into_response())
}
