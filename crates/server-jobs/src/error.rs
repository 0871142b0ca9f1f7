// crates/server-jobs/src/error.rs
use thiserror::Error;

use super::types::ScanId;

/// Errors returned by `ScanService` operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// A required field is missing or empty.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Scan not found: {0}")]
    NotFound(ScanId),

    /// A report was requested before the scan completed.
    #[error("Scan not completed yet: {0}")]
    NotReady(ScanId),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ScanError>;
