//! API error type and JSON error response formatting.
//!
//! Every failure that reaches the HTTP boundary is reported as
//! `500 {"detail": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use aiprofs_chat::ChatError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description of what went wrong.
    pub detail: String,
}

/// API error type mapped to an HTTP status and JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 500 Internal Server Error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        if err.is_bootstrap_failure() {
            tracing::error!(error = %err, "Document bootstrap failed while serving chat");
        } else {
            tracing::warn!(error = %err, "Chat request failed");
        }
        ApiError::Internal(err.to_string())
    }
}
