//! Team API routes
//!
//! - `GET /api/v1/team` - List members
//! - `PATCH /api/v1/team/:id/role` - Change a member's role (admin or higher)
//! - `DELETE /api/v1/team/:id` - Remove a member (admin or higher)

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;

use super::{
    commands::{self, ChangeRoleCommand},
    queries::{self, ListMembersQuery},
};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::error::ApiResult;
use crate::rbac::ActorContext;

pub fn team_routes() -> Router<AppState> {
    Router::new()
        .route("/team", get(list_members))
        .route("/team/:id", delete(remove_member))
        .route("/team/:id/role", patch(change_role))
}

#[tracing::instrument(skip(state, actor))]
async fn list_members(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<ListMembersQuery>,
) -> ApiResult<Response> {
    let members = queries::list::handle(&state.db, actor.organization_id, query).await?;
    Ok(ApiResponse::success(members).into_response())
}

#[tracing::instrument(skip(state, actor, command), fields(user_id = %actor.user_id))]
async fn change_role(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(member_id): Path<Uuid>,
    Json(command): Json<ChangeRoleCommand>,
) -> ApiResult<Response> {
    let member = commands::change_role::handle(&state.db, &actor, member_id, command).await?;
    Ok(ApiResponse::success(member).into_response())
}

#[tracing::instrument(skip(state, actor), fields(user_id = %actor.user_id))]
async fn remove_member(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Response> {
    let response = commands::remove::handle(&state.db, &actor, member_id).await?;
    Ok(ApiResponse::success(response).into_response())
}
