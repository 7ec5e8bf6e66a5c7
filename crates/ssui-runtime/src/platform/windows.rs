//! Windows process control.
//!
//! There is no SIGTERM equivalent for console-less children, so termination
//! and kill both use `TerminateProcess`. Liveness is a timed race against
//! `wait`.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

use super::Platform;

const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// How long [`WindowsPlatform::probe_alive`] lets `wait` run.
const PROBE_WINDOW: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

fn start_kill(child: &mut Child) -> io::Result<()> {
    match child.start_kill() {
        Ok(()) => Ok(()),
        // Already exited and reaped.
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Platform for WindowsPlatform {
    fn configure(&self, command: &mut Command) {
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    fn terminate(&self, child: &mut Child) -> io::Result<()> {
        debug!(pid = ?child.id(), "Terminating process");
        start_kill(child)
    }

    fn kill(&self, child: &mut Child) -> io::Result<()> {
        start_kill(child)
    }

    /// Heuristic: if `wait` completes inside the probe window the process is
    /// dead, otherwise it is presumed alive.
    async fn probe_alive(&self, child: &mut Child) -> bool {
        tokio::time::timeout(PROBE_WINDOW, child.wait()).await.is_err()
    }
}
