//! Axum-specific error types and mappings.
//!
//! Maps domain errors to HTTP status codes and a JSON body of the form
//! `{ "error": "...", "status": 409 }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use ssui_core::{CoreError, DetectionError, HubError, ProcessError};
use thiserror::Error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Operation conflicts with the current server state.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ProcessError> for HttpError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::AlreadyRunning | ProcessError::NotRunning => Self::Conflict(err.to_string()),
            ProcessError::StartFailed(msg) => Self::Internal(format!("Start failed: {msg}")),
            ProcessError::StopFailed(msg) => Self::Internal(format!("Stop failed: {msg}")),
            ProcessError::StopTimeout { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<HubError> for HttpError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::TooManyClients { .. } => Self::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<DetectionError> for HttpError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::InvalidPattern { .. } => Self::BadRequest(err.to_string()),
            DetectionError::NotFound(_) => Self::NotFound(err.to_string()),
            DetectionError::Storage(msg) => Self::Internal(format!("Storage: {msg}")),
        }
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Process(e) => e.into(),
            CoreError::Hub(e) => e.into(),
            CoreError::Detection(e) => e.into(),
            CoreError::Settings(e) => Self::BadRequest(e.to_string()),
            CoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}
