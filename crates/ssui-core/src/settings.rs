//! Settings domain types and validation.
//!
//! All fields are optional so a partial JSON file is valid; the
//! `effective_*` accessors apply defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hub::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CLIENTS, HubConfig};

/// Default port for the HTTP API and SSE streams.
pub const DEFAULT_HTTP_PORT: u16 = 8443;

/// Default grace period between SIGTERM and SIGKILL.
pub const DEFAULT_STOP_GRACE_SECS: u64 = 10;

/// Default wait after SIGKILL before giving up.
pub const DEFAULT_KILL_GRACE_SECS: u64 = 2;

/// Default per-client send timeout for hub delivery.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 1000;

/// Default location of the custom detections file.
pub const DEFAULT_CUSTOM_DETECTIONS_PATH: &str = "config/customdetections.json";

/// Supervisor settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Game server executable.
    pub executable_path: Option<String>,

    /// Argument vector passed to the executable, in order.
    pub executable_args: Option<Vec<String>>,

    /// Port for the HTTP API.
    pub http_port: Option<u16>,

    /// Maximum concurrent SSE clients per stream.
    pub max_sse_clients: Option<usize>,

    /// Per-client queue capacity.
    pub sse_buffer_size: Option<usize>,

    /// How long a full client may delay one message, in milliseconds.
    pub sse_send_timeout_ms: Option<u64>,

    /// Seconds to wait after SIGTERM before escalating.
    pub stop_grace_secs: Option<u64>,

    /// Seconds to wait after SIGKILL before reporting a stop timeout.
    pub kill_grace_secs: Option<u64>,

    /// When set, output is captured by tailing this file instead of pipes.
    pub legacy_log_file: Option<String>,

    /// Pass known-noisy engine lines through to the console stream.
    pub log_clutter_to_console: Option<bool>,

    /// JSON file holding user-defined detections.
    pub custom_detections_path: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            executable_path: None,
            executable_args: Some(Vec::new()),
            http_port: Some(DEFAULT_HTTP_PORT),
            max_sse_clients: Some(DEFAULT_MAX_CLIENTS),
            sse_buffer_size: Some(DEFAULT_BUFFER_SIZE),
            sse_send_timeout_ms: Some(DEFAULT_SEND_TIMEOUT_MS),
            stop_grace_secs: Some(DEFAULT_STOP_GRACE_SECS),
            kill_grace_secs: Some(DEFAULT_KILL_GRACE_SECS),
            legacy_log_file: None,
            log_clutter_to_console: Some(false),
            custom_detections_path: Some(DEFAULT_CUSTOM_DETECTIONS_PATH.to_string()),
        }
    }

    #[must_use]
    pub const fn effective_http_port(&self) -> u16 {
        match self.http_port {
            Some(port) => port,
            None => DEFAULT_HTTP_PORT,
        }
    }

    /// Argument vector (empty when unset).
    pub fn effective_args(&self) -> &[String] {
        self.executable_args.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub const fn effective_stop_grace(&self) -> Duration {
        match self.stop_grace_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_STOP_GRACE_SECS),
        }
    }

    #[must_use]
    pub const fn effective_kill_grace(&self) -> Duration {
        match self.kill_grace_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_KILL_GRACE_SECS),
        }
    }

    #[must_use]
    pub const fn log_clutter_to_console(&self) -> bool {
        matches!(self.log_clutter_to_console, Some(true))
    }

    pub fn effective_custom_detections_path(&self) -> &str {
        self.custom_detections_path
            .as_deref()
            .unwrap_or(DEFAULT_CUSTOM_DETECTIONS_PATH)
    }

    /// Hub sizing shared by the console and event streams.
    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_clients: self.max_sse_clients.unwrap_or(DEFAULT_MAX_CLIENTS),
            buffer_size: self.sse_buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE),
            send_timeout: Duration::from_millis(
                self.sse_send_timeout_ms.unwrap_or(DEFAULT_SEND_TIMEOUT_MS),
            ),
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Max SSE clients must be between 1 and 1000, got {0}")]
    InvalidMaxClients(usize),

    #[error("SSE buffer size must be between 1 and 100,000, got {0}")]
    InvalidBufferSize(usize),

    #[error("SSE send timeout must be between 1 and 60,000 ms, got {0}")]
    InvalidSendTimeout(u64),

    #[error("Stop grace period must be between 1 and 600 seconds, got {0}")]
    InvalidGracePeriod(u64),

    #[error("Executable path cannot be empty")]
    EmptyExecutablePath,

    #[error("Custom detections path cannot be empty")]
    EmptyDetectionsPath,
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(port) = settings.http_port {
        if port < 1024 {
            return Err(SettingsError::InvalidPort(port));
        }
    }

    if let Some(max) = settings.max_sse_clients {
        if !(1..=1000).contains(&max) {
            return Err(SettingsError::InvalidMaxClients(max));
        }
    }

    if let Some(size) = settings.sse_buffer_size {
        if !(1..=100_000).contains(&size) {
            return Err(SettingsError::InvalidBufferSize(size));
        }
    }

    if let Some(ms) = settings.sse_send_timeout_ms {
        if !(1..=60_000).contains(&ms) {
            return Err(SettingsError::InvalidSendTimeout(ms));
        }
    }

    for secs in [settings.stop_grace_secs, settings.kill_grace_secs]
        .into_iter()
        .flatten()
    {
        if !(1..=600).contains(&secs) {
            return Err(SettingsError::InvalidGracePeriod(secs));
        }
    }

    if settings
        .executable_path
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyExecutablePath);
    }

    if settings
        .custom_detections_path
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyDetectionsPath);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.http_port, Some(DEFAULT_HTTP_PORT));
        assert_eq!(settings.effective_stop_grace(), Duration::from_secs(10));
        assert_eq!(settings.effective_kill_grace(), Duration::from_secs(2));
        assert!(!settings.log_clutter_to_console());
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_empty_settings_fall_back() {
        let settings = Settings::default();
        assert_eq!(settings.effective_http_port(), DEFAULT_HTTP_PORT);
        assert!(settings.effective_args().is_empty());

        let hub = settings.hub_config();
        assert_eq!(hub.max_clients, 20);
        assert_eq!(hub.buffer_size, 2000);
        assert_eq!(hub.send_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json() {
        let settings: Settings =
            serde_json::from_str(r#"{"executablePath":"/srv/game","executableArgs":["-batchmode"]}"#)
                .unwrap();
        assert_eq!(settings.executable_path.as_deref(), Some("/srv/game"));
        assert_eq!(settings.effective_args(), ["-batchmode".to_string()]);
        assert_eq!(settings.http_port, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::with_defaults();
        settings.http_port = Some(80);
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidPort(80))
        ));

        let mut settings = Settings::with_defaults();
        settings.max_sse_clients = Some(0);
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidMaxClients(0))
        ));

        let mut settings = Settings::with_defaults();
        settings.kill_grace_secs = Some(0);
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidGracePeriod(0))
        ));

        let mut settings = Settings::with_defaults();
        settings.executable_path = Some("  ".to_string());
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyExecutablePath)
        ));
    }
}
