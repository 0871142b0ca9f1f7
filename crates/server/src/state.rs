// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;

use strix_server_jobs::ScanService;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Scan job service; owns the job store and spawns progress drivers.
    pub scans: ScanService,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(scans: ScanService) -> Arc<Self> {
        Arc::new(Self { scans })
    }
}
