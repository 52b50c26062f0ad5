//! Error types for findash-api.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Errors surfaced by screening operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    /// Client-input fault; names the parameter that failed.
    #[error("Invalid {parameter}: {reason}")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    /// A valid request that current data does not satisfy.
    #[error("{0}")]
    NotFound(String),

    /// The bar store failed. Details are logged, never returned.
    #[error("Service temporarily unavailable")]
    StorageUnavailable,
}

impl ScreenError {
    pub fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// HTTP status for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ScreenError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": ApiError {
                code: self.code().to_string(),
                message: self.to_string(),
            }
        });

        (self.status_code(), axum::Json(body)).into_response()
    }
}
