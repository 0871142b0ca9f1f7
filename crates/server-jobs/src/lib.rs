// crates/server-jobs/src/lib.rs
//! Scan job lifecycle: storage, background progress, and the service facade.
//!
//! Provides:
//! - `JobStore` / `InMemoryJobStore` — synchronized keyed storage of jobs
//! - `ProgressDriver` — one background task per job advancing it to a terminal status
//! - `ScanEngine` — seam producing the findings of a finished scan
//! - `ScanService` — create / get / list / delete / report

pub mod driver;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use driver::{DriverConfig, ProgressDriver};
pub use engine::{EngineError, ScanContext, ScanEngine, SimulatedEngine};
pub use error::{ScanError, ServiceResult};
pub use service::{new_scan_id, ScanService, REPORT_MESSAGE};
pub use store::{InMemoryJobStore, JobStore};
pub use types::{
    ReportPayload, RiskLevel, ScanId, ScanJob, ScanOptions, ScanResults, ScanStatus, ScanSummary,
    VulnerabilityCounts,
};
