//! API error types.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use warden_core::{IssueCode, ValidationError};

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The prompt failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The request body was not valid JSON for this endpoint.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    /// The pipeline did not finish within the request deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IssueCode>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Timeout(_) => (StatusCode::INTERNAL_SERVER_ERROR, "timeout"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            error!(code, error = %self, "Request failed");
        }

        let issues = match &self {
            ApiError::Validation(e) => vec![e.issue()],
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            issues,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
