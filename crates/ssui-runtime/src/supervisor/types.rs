//! Supervisor state and configuration types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use ssui_core::Settings;

use crate::capture::CaptureMode;

/// Lifecycle state of the supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    NotRunning,
    Starting,
    Running,
    Stopping,
}

/// Identity of a running server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessHandle {
    pub pid: u32,
    /// Process group id. Equal to `pid` because the server leads its own group.
    pub pgid: u32,
    pub started_at: DateTime<Utc>,
}

/// Supervisor timing and capture policy.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Wait after the graceful signal before escalating.
    pub stop_grace: Duration,
    /// Wait after the kill signal before reporting a stop timeout.
    pub kill_grace: Duration,
    /// Upper bound on reading pipes to EOF after the process has exited.
    pub drain_timeout: Duration,
    pub capture: CaptureMode,
}

/// Default upper bound for the post-exit pipe drain.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            stop_grace: Duration::from_secs(ssui_core::settings::DEFAULT_STOP_GRACE_SECS),
            kill_grace: Duration::from_secs(ssui_core::settings::DEFAULT_KILL_GRACE_SECS),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            capture: CaptureMode::Pipes,
        }
    }
}

impl From<&Settings> for SupervisorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            stop_grace: settings.effective_stop_grace(),
            kill_grace: settings.effective_kill_grace(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            capture: CaptureMode::from_log_file(settings.legacy_log_file.as_deref()),
        }
    }
}
