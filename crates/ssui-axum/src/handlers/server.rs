//! Server handlers - game server start/stop/status and player sessions.

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use ssui_runtime::{ProcessHandle, ProcessState};
use tracing::info;

use crate::error::HttpError;
use crate::state::AppState;

/// Response body for `/v2/server/status`.
#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub state: ProcessState,
    pub running: bool,
    pub pid: Option<u32>,
}

/// Response body for `/v2/server/stop`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Start the configured executable.
///
/// Player sessions are cleared by the supervisor's start hook, before the
/// process is spawned.
pub async fn start(State(state): State<AppState>) -> Result<Json<ProcessHandle>, HttpError> {
    let executable = state
        .settings
        .executable_path
        .as_deref()
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| HttpError::BadRequest("No executable path configured".to_string()))?;

    let handle = state
        .supervisor
        .start(executable, state.settings.effective_args())
        .await?;
    info!(pid = handle.pid, "Server started via API");
    Ok(Json(handle))
}

/// Stop the running server.
pub async fn stop(State(state): State<AppState>) -> Result<Json<StopResponse>, HttpError> {
    state.supervisor.stop().await?;
    Ok(Json(StopResponse { stopped: true }))
}

/// Liveness and lifecycle state of the server process.
pub async fn status(State(state): State<AppState>) -> Json<ServerStatus> {
    let running = state.supervisor.is_running().await;
    Json(ServerStatus {
        state: state.supervisor.state(),
        running,
        pid: state.supervisor.handle().map(|h| h.pid),
    })
}

/// Currently connected players, keyed by SteamID.
pub async fn players(State(state): State<AppState>) -> Json<HashMap<String, String>> {
    Json(state.detector.connected_players())
}
