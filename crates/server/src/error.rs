// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use strix_server_jobs::ScanError;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Request body could not be read as the expected JSON.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Scan(scan_err) => match scan_err {
                ScanError::InvalidInput(msg) => {
                    tracing::warn!(message = %msg, "Invalid scan request");
                    (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
                }
                ScanError::NotFound(id) => {
                    tracing::warn!(scan_id = %id, "Scan not found");
                    (
                        StatusCode::NOT_FOUND,
                        ErrorResponse::with_details("Scan not found", format!("Scan ID: {}", id)),
                    )
                }
                ScanError::NotReady(id) => {
                    tracing::warn!(scan_id = %id, "Report requested before scan completed");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details(
                            "Scan not completed yet",
                            format!("Scan ID: {}", id),
                        ),
                    )
                }
                ScanError::Internal(msg) => {
                    tracing::error!(message = %msg, "Scan service internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new("Internal server error"),
                    )
                }
            },
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
