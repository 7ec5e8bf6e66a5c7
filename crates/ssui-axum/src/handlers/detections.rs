//! Custom detection handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ssui_core::CustomDetection;

use crate::error::HttpError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Json<Vec<CustomDetection>> {
    Json(state.detections.list().await)
}

/// Validate and store a detection. Returns it with its assigned id.
pub async fn add(
    State(state): State<AppState>,
    Json(detection): Json<CustomDetection>,
) -> Result<(StatusCode, Json<CustomDetection>), HttpError> {
    let stored = state.detections.add(detection).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    state.detections.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
