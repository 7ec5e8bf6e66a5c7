//! OS-specific process control.
//!
//! The supervisor never touches signals or process groups directly; it goes
//! through a [`Platform`]. [`native()`] picks the implementation for the
//! build target.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::{Child, Command};

#[cfg(unix)]
pub use unix::UnixPlatform;
#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Process control primitives for one OS family.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Prepare a command before spawn (process group, creation flags).
    fn configure(&self, command: &mut Command);

    /// Ask the process (and its group, where supported) to exit.
    ///
    /// A process that is already gone is not an error.
    fn terminate(&self, child: &mut Child) -> io::Result<()>;

    /// Forcefully kill the process (and its group, where supported).
    fn kill(&self, child: &mut Child) -> io::Result<()>;

    /// Best-effort, non-blocking liveness check.
    ///
    /// `false` means the process has certainly exited. `true` means it was
    /// alive at some point during the probe; it may die right after.
    async fn probe_alive(&self, child: &mut Child) -> bool;
}

/// Platform implementation for the current target.
pub fn native() -> Arc<dyn Platform> {
    #[cfg(unix)]
    {
        Arc::new(UnixPlatform)
    }

    #[cfg(windows)]
    {
        Arc::new(WindowsPlatform)
    }
}
