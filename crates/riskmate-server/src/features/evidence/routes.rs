//! Evidence API routes
//!
//! - `GET /api/v1/jobs/:id/evidence` - List a job's evidence
//! - `POST /api/v1/jobs/:id/evidence` - Upload a file (multipart field `file`)
//! - `GET /api/v1/jobs/:id/evidence/:evidence_id/download` - Presigned download link

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use super::{commands, queries, types::EvidenceUpload};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::error::{ApiResult, AppError};
use crate::rbac::ActorContext;

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "file";

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn evidence_routes(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/jobs/:id/evidence",
            get(list_evidence)
                .post(upload_evidence)
                .layer(DefaultBodyLimit::max(max_bytes + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/jobs/:id/evidence/:evidence_id/download", get(download_evidence))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Pull the `file` field out of the form, ignoring any other fields
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<EvidenceUpload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?.to_vec();
        return Ok(EvidenceUpload {
            file_name,
            content_type,
            data,
        });
    }
    Err(AppError::Validation(format!(
        "Multipart field '{FILE_FIELD}' is required"
    )))
}

#[tracing::instrument(skip(state, actor))]
async fn list_evidence(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Response> {
    let evidence = queries::list::handle(&state.db, actor.organization_id, job_id).await?;
    Ok(ApiResponse::success(evidence).into_response())
}

#[tracing::instrument(skip(state, actor, multipart), fields(user_id = %actor.user_id))]
async fn upload_evidence(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(job_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let upload = read_file_field(&mut multipart).await?;
    let record = commands::upload::handle(
        &state.db,
        &state.storage,
        &actor,
        job_id,
        upload,
        state.uploads.evidence_max_bytes,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))).into_response())
}

#[tracing::instrument(skip(state, actor))]
async fn download_evidence(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path((job_id, evidence_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    let download =
        queries::download::handle(&state.db, &state.storage, &actor, job_id, evidence_id).await?;
    Ok(ApiResponse::success(download).into_response())
}
