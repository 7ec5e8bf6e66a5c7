//! Process supervisor: start, stop and liveness of the game server.
//!
//! # State machine
//!
//! ```text
//! NotRunning -> Starting -> Running -> Stopping -> NotRunning
//!                  |                      |
//!                  +-> NotRunning         +-> Running (stop timed out)
//! ```
//!
//! Start and Stop hold one async mutex for their whole duration, so they
//! never interleave. [`Supervisor::is_running`] only `try_lock`s and falls
//! back to the published state while an operation is in flight.
//!
//! # Stop
//!
//! 1. Graceful signal to the process group, wait `stop_grace`
//! 2. Kill signal to the process group, wait `kill_grace`
//! 3. Still alive: [`ProcessError::StopTimeout`]; the handle is kept
//!
//! # Capture drain
//!
//! Once the process has exited, pipe readers keep running until EOF so the
//! last lines a server prints still reach the sink. Only after
//! `drain_timeout` is the capture token cancelled. Stop joins the drain
//! before returning. [`Supervisor::is_running`] moves it to a background
//! task instead, and the next Start joins that task before spawning, so
//! output of two runs never interleaves.

mod types;

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use ssui_core::{ConsoleSink, ProcessError};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::platform::Platform;

pub use types::{ProcessHandle, ProcessState, SupervisorConfig};

/// Hook run by Start right before the process is spawned.
type StartHook = Box<dyn Fn() + Send + Sync>;

struct Tracked {
    child: Child,
    handle: ProcessHandle,
    capture: Capture,
}

/// Capture tasks of one run.
struct Capture {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    pipes: bool,
}

impl Capture {
    /// Let pipe readers reach EOF within `limit`, then cancel what is left.
    async fn drain(self, limit: Duration) {
        let Self {
            cancel,
            tasks,
            pipes,
        } = self;
        if !pipes {
            // A tail never sees EOF; cancellation triggers its final read.
            cancel.cancel();
        }

        let deadline = tokio::time::Instant::now() + limit;
        for mut task in tasks {
            let joined = match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    if !cancel.is_cancelled() {
                        warn!(?limit, "Capture did not reach EOF in time, cancelling");
                        cancel.cancel();
                    }
                    task.await
                }
            };
            if let Err(e) = joined {
                warn!(error = %e, "Capture task ended abnormally");
            }
        }
        cancel.cancel();
    }
}

/// Owns the lifecycle of at most one server process.
pub struct Supervisor {
    platform: Arc<dyn Platform>,
    sink: Arc<dyn ConsoleSink>,
    config: SupervisorConfig,
    tracked: Mutex<Option<Tracked>>,
    /// Drain of a run found dead by `is_running`, joined by the next Start.
    draining: StdMutex<Option<JoinHandle<()>>>,
    on_start: Option<StartHook>,
    state: watch::Sender<ProcessState>,
}

impl Supervisor {
    pub fn new(
        platform: Arc<dyn Platform>,
        sink: Arc<dyn ConsoleSink>,
        config: SupervisorConfig,
    ) -> Self {
        let (state, _) = watch::channel(ProcessState::NotRunning);
        Self {
            platform,
            sink,
            config,
            tracked: Mutex::new(None),
            draining: StdMutex::new(None),
            on_start: None,
            state,
        }
    }

    /// Run `hook` on every Start, after output of the previous run has been
    /// fully captured and before the new process is spawned.
    #[must_use]
    pub fn with_start_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start = Some(Box::new(hook));
        self
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Last published state.
    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ProcessState> {
        self.state.subscribe()
    }

    /// Handle of the tracked process, if any and if no operation holds the lock.
    pub fn handle(&self) -> Option<ProcessHandle> {
        self.tracked
            .try_lock()
            .ok()
            .and_then(|tracked| tracked.as_ref().map(|t| t.handle.clone()))
    }

    /// Spawn `executable` with `args` and start capturing its output.
    pub async fn start(
        &self,
        executable: &str,
        args: &[String],
    ) -> Result<ProcessHandle, ProcessError> {
        let mut tracked = self.tracked.lock().await;

        if let Some(current) = tracked.as_mut() {
            if self.platform.probe_alive(&mut current.child).await {
                return Err(ProcessError::AlreadyRunning);
            }
            debug!(pid = current.handle.pid, "Clearing handle of exited process");
            if let Some(stale) = tracked.take() {
                self.finish(stale, None).await;
            }
        }
        self.join_draining().await;

        self.set_state(ProcessState::Starting);
        info!(%executable, ?args, "Starting server");
        if let Some(hook) = &self.on_start {
            hook();
        }
        let origin = self.config.capture.origin().await;

        let mut command = Command::new(executable);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        if self.config.capture.uses_pipes() {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        self.platform.configure(&mut command);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.set_state(ProcessState::NotRunning);
                error!(%executable, error = %e, "Failed to start server");
                return Err(ProcessError::StartFailed(format!("{executable}: {e}")));
            }
        };
        let Some(pid) = child.id() else {
            self.set_state(ProcessState::NotRunning);
            return Err(ProcessError::StartFailed(format!(
                "{executable}: exited before a PID was assigned"
            )));
        };

        let cancel = CancellationToken::new();
        let capture = Capture {
            tasks: self
                .config
                .capture
                .spawn(&mut child, origin, &self.sink, &cancel),
            cancel,
            pipes: self.config.capture.uses_pipes(),
        };
        let handle = ProcessHandle {
            pid,
            pgid: pid,
            started_at: Utc::now(),
        };
        *tracked = Some(Tracked {
            child,
            handle: handle.clone(),
            capture,
        });
        self.set_state(ProcessState::Running);
        info!(pid, capture = ?self.config.capture, "Server started");

        Ok(handle)
    }

    /// Stop the tracked process, escalating from terminate to kill.
    pub async fn stop(&self) -> Result<(), ProcessError> {
        let mut tracked = self.tracked.lock().await;
        let Some(current) = tracked.as_mut() else {
            return Err(ProcessError::NotRunning);
        };
        let pid = current.handle.pid;
        self.set_state(ProcessState::Stopping);
        info!(pid, "Stopping server");

        if let Err(e) = self.platform.terminate(&mut current.child) {
            warn!(pid, error = %e, "Failed to send graceful stop signal");
        }

        let status = match wait_for_exit(&mut current.child, self.config.stop_grace).await {
            Some(result) => result,
            None => {
                warn!(
                    pid,
                    grace = ?self.config.stop_grace,
                    "Server did not exit in time, sending kill signal"
                );
                if let Err(e) = self.platform.kill(&mut current.child) {
                    warn!(pid, error = %e, "Failed to send kill signal");
                }
                match wait_for_exit(&mut current.child, self.config.kill_grace).await {
                    Some(result) => result,
                    None => {
                        self.set_state(ProcessState::Running);
                        error!(pid, waited = ?self.config.kill_grace, "Server survived kill signal");
                        return Err(ProcessError::StopTimeout {
                            pid,
                            waited: self.config.kill_grace,
                        });
                    }
                }
            }
        };

        let status = match status {
            Ok(status) => Some(status),
            Err(e) => {
                self.set_state(ProcessState::Running);
                return Err(ProcessError::StopFailed(e.to_string()));
            }
        };

        if let Some(done) = tracked.take() {
            self.finish(done, status).await;
        }
        Ok(())
    }

    /// Non-blocking liveness check.
    ///
    /// A process found dead is cleared as a side effect; its remaining output
    /// is drained in the background. While Start or Stop is in progress the
    /// published state answers instead of a probe.
    pub async fn is_running(&self) -> bool {
        let Ok(mut tracked) = self.tracked.try_lock() else {
            return self.state() != ProcessState::NotRunning;
        };
        let Some(current) = tracked.as_mut() else {
            return false;
        };
        if self.platform.probe_alive(&mut current.child).await {
            return true;
        }
        if let Some(dead) = tracked.take() {
            info!(pid = dead.handle.pid, "Server process has exited");
            let drain = tokio::spawn(dead.capture.drain(self.config.drain_timeout));
            if let Some(previous) = self.lock_draining().replace(drain) {
                previous.abort();
            }
            self.set_state(ProcessState::NotRunning);
        }
        false
    }

    /// Stop the server if one is running. Used on application shutdown.
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(()) | Err(ProcessError::NotRunning) => {}
            Err(e) => error!(error = %e, "Failed to stop server during shutdown"),
        }
        self.join_draining().await;
    }

    /// Drain capture and publish `NotRunning`.
    async fn finish(&self, done: Tracked, status: Option<ExitStatus>) {
        done.capture.drain(self.config.drain_timeout).await;
        self.set_state(ProcessState::NotRunning);
        info!(pid = done.handle.pid, ?status, "Server stopped");
    }

    async fn join_draining(&self) {
        let pending = self.lock_draining().take();
        if let Some(drain) = pending {
            if let Err(e) = drain.await {
                warn!(error = %e, "Capture drain ended abnormally");
            }
        }
    }

    fn lock_draining(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.draining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ProcessState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(?previous, ?next, "Process state changed");
        }
    }
}

async fn wait_for_exit(child: &mut Child, limit: Duration) -> Option<io::Result<ExitStatus>> {
    tokio::time::timeout(limit, child.wait()).await.ok()
}
