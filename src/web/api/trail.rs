use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ingest::IngestStatus;
use crate::trail::{Advisory, Fix, TRAIL_CAPACITY};
use crate::web::api::error::ApiResult;
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[utoipa::path(
    get,
    path = "/api/trail",
    tag = "trail",
    responses(
        (status = 200, description = "Cached trail as of the last poll, newest first", body = Vec<Fix>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn trail(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<Fix>>> {
    require_permission(&user, Permission::ReadTrail)?;
    let fixes = state.snapshot_rx.borrow().fixes.clone();
    Ok(Json(fixes))
}

#[utoipa::path(
    get,
    path = "/api/trail/live",
    tag = "trail",
    responses(
        (status = 200, description = "Live ingest view, including throttled fixes", body = IngestStatus),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn live(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<IngestStatus>> {
    require_permission(&user, Permission::ReadTrail)?;
    let status = state.status_rx.borrow().clone();
    Ok(Json(status))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrailStatus {
    pub available: bool,
    /// Fixes in the last published snapshot.
    pub cached: usize,
    pub capacity: usize,
    pub admitted: u64,
    pub dropped: u64,
    pub advisory: Option<Advisory>,
    pub polled_at: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/trail/status",
    tag = "trail",
    responses(
        (status = 200, description = "Availability and ingest counters", body = TrailStatus),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<TrailStatus>> {
    require_permission(&user, Permission::ReadTrail)?;

    let ingest = state.status_rx.borrow().clone();
    let snapshot = state.snapshot_rx.borrow().clone();

    Ok(Json(TrailStatus {
        available: state.cache.is_available(),
        cached: snapshot.fixes.len(),
        capacity: TRAIL_CAPACITY,
        admitted: ingest.admitted,
        dropped: ingest.dropped,
        // Ingest advisories are fresher; fall back to the poll side.
        advisory: ingest.advisory.or(snapshot.advisory),
        polled_at: snapshot.polled_at,
    }))
}
