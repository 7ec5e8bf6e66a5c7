//! OS-level runtime for ssui: the process supervisor, per-OS process control
//! and output capture.

#![deny(unused_crate_dependencies)]

pub mod capture;
pub mod platform;
pub mod supervisor;

pub use capture::CaptureMode;
pub use platform::{Platform, native};
pub use supervisor::{ProcessHandle, ProcessState, Supervisor, SupervisorConfig};

#[cfg(test)]
use tokio_test as _;
