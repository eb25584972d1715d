//! API error handling.
//!
//! Every failed request answers with a `{code, message}` JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::downloader::{DownloadError, FailureReason};

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: Option<&str>) -> Self {
        self.hint = hint.map(str::to_string);
        self
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
            hint: self.hint,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        let reason = err.reason();
        let message = err.to_string();

        match err {
            DownloadError::ToolNotFound(_)
            | DownloadError::Resolution {
                reason: FailureReason::ToolNotFound,
                ..
            } => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "TOOL_NOT_FOUND", message)
                .with_hint(reason.hint()),
            DownloadError::Resolution { .. } | DownloadError::InvalidUrl(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "RESOLUTION_FAILED", message)
                    .with_hint(reason.hint())
            }
            DownloadError::NoMatchingStream(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "NO_MATCHING_STREAM", message)
            }
            DownloadError::Transfer(_) | DownloadError::NetworkTimeout(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "TRANSFER_FAILED", message)
            }
            _ => {
                tracing::error!("Unexpected error: {}", message);
                ApiError::internal(message)
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
