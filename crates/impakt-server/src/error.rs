//! HTTP error responses.
//!
//! Every failure a handler can produce becomes an [`ApiError`], rendered as
//! `{"status_code": 404, "type": "NOT_FOUND", "message": "..."}`. Store errors
//! are mapped here and nowhere else.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use impakt_store::StoreError;
use serde::Serialize;

/// Message used for failures whose detail stays in the logs.
const SERVER_ERROR: &str = "Server error";

/// An error response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    /// HTTP status.
    pub status: StatusCode,
    /// Client-facing message.
    pub message: String,
}

/// Serialized body of an [`ApiError`].
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric status.
    pub status_code: u16,
    /// Status name, e.g. `NOT_FOUND`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Client-facing message.
    pub message: String,
}

impl ApiError {
    /// Error with an arbitrary status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 with the generic message.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
    }

    /// Body as sent to the client.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status.as_u16(),
            kind: status_name(self.status),
            message: self.message.clone(),
        }
    }
}

/// `Not Found` → `NOT_FOUND`.
fn status_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown")
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
        .replace('\'', "")
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } | StoreError::ForeignKeyViolation { .. } => {
                Self::not_found(err.to_string())
            }
            StoreError::ResourceExists { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            StoreError::Validation(message) => Self::bad_request(message),
            StoreError::Integrity { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            other => {
                tracing::error!(error = %other, "store failure");
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.body();
        if self.status.is_server_error() {
            tracing::error!(status = body.status_code, kind = %body.kind, message = %body.message, "request failed");
        } else {
            tracing::warn!(status = body.status_code, kind = %body.kind, message = %body.message, "request rejected");
        }
        (self.status, Json(body)).into_response()
    }
}
