//! POSIX process control: process groups and group-wide signals.

use std::io;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::debug;

use super::Platform;

/// Spawns each server as the leader of a new process group and signals the
/// whole group, so helper processes die with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPlatform;

fn group_of(child: &Child) -> io::Result<Pid> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "child has no PID"))?;
    let raw = i32::try_from(pid).map_err(io::Error::other)?;
    Ok(Pid::from_raw(raw))
}

fn signal_group(child: &Child, sig: Signal) -> io::Result<()> {
    let pgid = match group_of(child) {
        Ok(pgid) => pgid,
        // Already reaped.
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => return Ok(()),
        Err(e) => return Err(e),
    };
    match signal::killpg(pgid, sig) {
        Ok(()) => {
            debug!(pgid = %pgid, signal = %sig, "Signalled process group");
            Ok(())
        }
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[async_trait]
impl Platform for UnixPlatform {
    fn configure(&self, command: &mut Command) {
        command.process_group(0);
    }

    fn terminate(&self, child: &mut Child) -> io::Result<()> {
        signal_group(child, Signal::SIGTERM)
    }

    fn kill(&self, child: &mut Child) -> io::Result<()> {
        signal_group(child, Signal::SIGKILL)
    }

    async fn probe_alive(&self, child: &mut Child) -> bool {
        // An exited but unreaped child still answers signal 0, so reap first.
        match child.try_wait() {
            Ok(Some(_)) | Err(_) => return false,
            Ok(None) => {}
        }
        let Ok(pid) = group_of(child) else {
            return false;
        };
        signal::kill(pid, None).is_ok()
    }
}
