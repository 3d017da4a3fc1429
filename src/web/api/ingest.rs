use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ingest::SourceEvent;
use crate::trail::Fix;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub queued: bool,
}

#[utoipa::path(
    post,
    path = "/api/fix",
    tag = "ingest",
    request_body = Fix,
    responses(
        (status = 202, description = "Fix queued for ingestion", body = SubmitResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions"),
        (status = 503, description = "Ingest worker stopped", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn submit_fix(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(fix): Json<Fix>,
) -> ApiResult<impl IntoResponse> {
    require_permission(&user, Permission::SubmitFix)?;
    log::debug!("Fix submitted by {}", user.name);

    state
        .fix_tx
        .send(SourceEvent::Fix(fix))
        .await
        .map_err(|_| ApiError::IngestClosed)?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { queued: true })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SourceErrorRequest {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/fix/error",
    tag = "ingest",
    request_body = SourceErrorRequest,
    responses(
        (status = 202, description = "Source error queued", body = SubmitResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions"),
        (status = 503, description = "Ingest worker stopped", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn submit_error(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<SourceErrorRequest>,
) -> ApiResult<impl IntoResponse> {
    require_permission(&user, Permission::SubmitFix)?;

    state
        .fix_tx
        .send(SourceEvent::Error(request.message))
        .await
        .map_err(|_| ApiError::IngestClosed)?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { queued: true })))
}
