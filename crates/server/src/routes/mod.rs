//! API route handlers for the Strix server.

pub mod health;
pub mod scans;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET    /api/health - Health check
/// - POST   /api/scans - Start a scan
/// - GET    /api/scans - List all scans, newest first
/// - GET    /api/scans/{id} - Get scan status
/// - DELETE /api/scans/{id} - Delete a scan
/// - GET    /api/scans/{id}/report - Results of a completed scan
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", scans::router())
        .with_state(state)
}
