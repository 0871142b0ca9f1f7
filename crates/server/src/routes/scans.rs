//! Scan job endpoints.
//!
//! - POST   /scans — start a scan
//! - GET    /scans — list scans, newest first
//! - GET    /scans/{id} — current state of one scan
//! - DELETE /scans/{id} — remove a scan (stops its progress on the next tick)
//! - GET    /scans/{id}/report — results of a completed scan

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use strix_server_jobs::{ReportPayload, ScanJob, ScanOptions};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for starting a scan.
///
/// `target` is optional here so a missing value surfaces as a validation
/// error from the service rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub options: Option<ScanOptions>,
}

/// POST /api/scans - Start a new scan.
///
/// Body: `{ "target": "example.com", "options": { ... } }`
/// Returns 201 with the freshly created (running, 0%) job.
pub async fn create_scan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateScanRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ScanJob>)> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let job = state
        .scans
        .create_scan(body.target, body.options.unwrap_or_default())?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/scans - All scans, most recently created first.
pub async fn list_scans(State(state): State<Arc<AppState>>) -> Json<Vec<ScanJob>> {
    Json(state.scans.list_scans())
}

/// GET /api/scans/{id} - Current state of a scan.
pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScanJob>> {
    Ok(Json(state.scans.get_scan(&id)?))
}

/// DELETE /api/scans/{id} - Delete a scan. 204 on success.
pub async fn delete_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.scans.delete_scan(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/scans/{id}/report - Results of a completed scan.
///
/// 400 while the scan is still running (or failed).
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReportPayload>> {
    Ok(Json(state.scans.get_report(&id)?))
}

/// Create the scan routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scans", get(list_scans).post(create_scan))
        .route("/scans/{id}", get(get_scan).delete(delete_scan))
        .route("/scans/{id}/report", get(get_report))
}
