//! Output capture: getting server output into the console sink.
//!
//! - [`CaptureMode::Pipes`]: one reader per stdout/stderr pipe
//! - [`CaptureMode::Tail`]: follow a log file the server writes itself
//!
//! Pipe readers stop on EOF or on a read error (reported as a diagnostic
//! line). The supervisor cancels them only when EOF does not arrive within
//! its drain timeout. A tail never sees EOF and stops on cancellation after
//! one final read.

mod pipe;
mod tail;

use std::fs::Metadata;
use std::path::PathBuf;
use std::sync::Arc;

use ssui_core::ConsoleSink;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use pipe::spawn_pipe_reader;
pub use tail::{OPEN_ATTEMPTS, OPEN_RETRY_DELAY, spawn_tail};

/// Where server output is read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CaptureMode {
    #[default]
    Pipes,
    Tail(PathBuf),
}

impl CaptureMode {
    /// Tail mode when a log file is configured, pipes otherwise.
    pub fn from_log_file(log_file: Option<&str>) -> Self {
        log_file
            .filter(|p| !p.trim().is_empty())
            .map_or(Self::Pipes, |p| Self::Tail(PathBuf::from(p)))
    }

    pub const fn uses_pipes(&self) -> bool {
        matches!(self, Self::Pipes)
    }

    /// State of the log file before the server is spawned.
    ///
    /// Tailing resumes after this point so output of earlier runs is not
    /// replayed. `None` for pipes or when the file does not exist yet.
    pub(crate) async fn origin(&self) -> Option<Metadata> {
        match self {
            Self::Pipes => None,
            Self::Tail(path) => tokio::fs::metadata(path).await.ok(),
        }
    }

    /// Start the capture tasks for a freshly spawned `child`.
    pub(crate) fn spawn(
        &self,
        child: &mut Child,
        origin: Option<Metadata>,
        sink: &Arc<dyn ConsoleSink>,
        cancel: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        match self {
            Self::Pipes => {
                let mut tasks = Vec::with_capacity(2);
                if let Some(stdout) = child.stdout.take() {
                    tasks.push(spawn_pipe_reader(
                        stdout,
                        "stdout",
                        Arc::clone(sink),
                        cancel.clone(),
                    ));
                }
                if let Some(stderr) = child.stderr.take() {
                    tasks.push(spawn_pipe_reader(
                        stderr,
                        "stderr",
                        Arc::clone(sink),
                        cancel.clone(),
                    ));
                }
                tasks
            }
            Self::Tail(path) => vec![spawn_tail(
                path.clone(),
                origin,
                Arc::clone(sink),
                cancel.clone(),
            )],
        }
    }
}
