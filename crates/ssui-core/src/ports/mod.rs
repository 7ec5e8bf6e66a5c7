//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No process/filesystem implementation details in signatures
//! - Sinks are line-oriented: capture produces plain text, no framing
//! - Errors are semantic; adapters map them to status codes

pub mod console_sink;
pub mod log_forwarder;

use std::time::Duration;
use thiserror::Error;

pub use console_sink::ConsoleSink;
pub use log_forwarder::{LogForwarder, NoopForwarder};

/// Domain-specific errors for process supervisor operations.
///
/// `AlreadyRunning` and `NotRunning` are caller mistakes and are never
/// retried. `StopTimeout` means the process ignored SIGKILL for the whole
/// kill grace period and may have leaked.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Start was requested while a process is tracked.
    #[error("Server is already running")]
    AlreadyRunning,

    /// Stop was requested while no process is tracked.
    #[error("Server is not running")]
    NotRunning,

    /// Failed to spawn the process.
    #[error("Failed to start: {0}")]
    StartFailed(String),

    /// Signalling or reaping the process failed.
    #[error("Failed to stop: {0}")]
    StopFailed(String),

    /// The process survived the forceful kill window.
    #[error("Process {pid} did not exit within {waited:?} after SIGKILL")]
    StopTimeout {
        /// OS process id of the stuck process.
        pid: u32,
        /// How long we waited after the kill signal.
        waited: Duration,
    },
}

impl ProcessError {
    /// True for errors caused by calling Start/Stop in the wrong state.
    pub const fn is_state_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }
}

/// Core error type for semantic domain errors.
///
/// This is the canonical error type used across the core domain.
/// Adapters should map this to their own error types (HTTP status codes,
/// CLI exit codes).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Process operation failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Hub subscription failed.
    #[error(transparent)]
    Hub(#[from] crate::hub::HubError),

    /// Detection configuration failed.
    #[error(transparent)]
    Detection(#[from] crate::detection::DetectionError),

    /// Settings validation error.
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Internal error (unexpected condition).
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conflicts() {
        assert!(ProcessError::AlreadyRunning.is_state_conflict());
        assert!(ProcessError::NotRunning.is_state_conflict());
        assert!(!ProcessError::StartFailed("boom".into()).is_state_conflict());
    }

    #[test]
    fn test_stop_timeout_message() {
        let err = ProcessError::StopTimeout {
            pid: 42,
            waited: Duration::from_secs(2),
        };
        assert_eq!(
            err.to_string(),
            "Process 42 did not exit within 2s after SIGKILL"
        );
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: CoreError = ProcessError::NotRunning.into();
        assert_eq!(err.to_string(), "Server is not running");
    }
}
