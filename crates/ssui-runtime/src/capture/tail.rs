//! Log file tailing for servers that do not flush reliably through pipes.
//!
//! The file may not exist yet when the server starts, so opening is retried
//! a bounded number of times. Once open, new data is picked up on filesystem
//! change events (with a slow poll as a fallback) and the file is reopened
//! from the beginning whenever it is removed, renamed or truncated.
//!
//! Content already present before the server was spawned is skipped: only
//! lines written by the current run are forwarded.

use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ssui_core::ConsoleSink;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pipe::decode_line;

/// Attempts to open the log file before giving up.
pub const OPEN_ATTEMPTS: u32 = 10;

/// Delay between open attempts.
pub const OPEN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fallback poll when no change events arrive.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Read position within one open log file.
struct LogTail {
    file: File,
    pos: u64,
    partial: Vec<u8>,
}

impl LogTail {
    const fn new(file: File) -> Self {
        Self {
            file,
            pos: 0,
            partial: Vec::new(),
        }
    }

    /// Continue from `pos` instead of the start of the file.
    async fn skip_to(&mut self, pos: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos)).await?;
        self.pos = pos;
        Ok(())
    }

    /// Read everything appended since the last call and return complete lines.
    ///
    /// A trailing line without newline is held back until it is completed.
    /// A file that shrank is treated as truncated and re-read from the start.
    async fn read_available(&mut self) -> io::Result<Vec<String>> {
        let len = self.file.metadata().await?.len();
        if len < self.pos {
            debug!(len, pos = self.pos, "Log file truncated, rewinding");
            self.file.seek(SeekFrom::Start(0)).await?;
            self.pos = 0;
            self.partial.clear();
        }

        let mut chunk = Vec::new();
        let read = self.file.read_to_end(&mut chunk).await?;
        self.pos += read as u64;
        self.partial.extend_from_slice(&chunk);

        let mut lines = Vec::new();
        while let Some(newline) = self.partial.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.partial.drain(..=newline).collect();
            lines.push(decode_line(&mut line));
        }
        Ok(lines)
    }

    /// Remaining unterminated text, if any.
    fn take_partial(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let mut rest = std::mem::take(&mut self.partial);
        Some(decode_line(&mut rest))
    }
}

/// Spawn the tail task for `path`.
///
/// `origin` is the file's metadata from before the server started, if it
/// existed. When the opened file is still that file, reading starts at its
/// old length. A file created or replaced since is read from the start.
///
/// Ends when `cancel` fires, when the file never appears, or on a read error
/// (reported into the sink as a diagnostic line).
pub fn spawn_tail(
    path: PathBuf,
    origin: Option<Metadata>,
    sink: Arc<dyn ConsoleSink>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_tail(&path, origin.as_ref(), sink.as_ref(), &cancel).await;
        debug!(path = %path.display(), "Tail task exiting");
    })
}

async fn open_with_retry(path: &Path, cancel: &CancellationToken) -> Option<File> {
    for attempt in 1..=OPEN_ATTEMPTS {
        match File::open(path).await {
            Ok(file) => return Some(file),
            Err(e) => {
                debug!(path = %path.display(), attempt, error = %e, "Log file not available yet");
            }
        }
        tokio::select! {
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(OPEN_RETRY_DELAY) => {}
        }
    }
    None
}

fn watch_parent(path: &Path) -> (Option<RecommendedWatcher>, mpsc::UnboundedReceiver<notify::Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })
    .and_then(|mut watcher| {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    });

    match watcher {
        Ok(watcher) => (Some(watcher), rx),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "File watcher unavailable, polling only");
            (None, rx)
        }
    }
}

fn concerns(event: &notify::Event, path: &Path) -> bool {
    event
        .paths
        .iter()
        .any(|p| p.file_name() == path.file_name())
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    matches!((a.created(), b.created()), (Ok(x), Ok(y)) if x == y)
}

/// Offset where output of the current run begins in `file`.
async fn resume_offset(file: &File, origin: Option<&Metadata>) -> u64 {
    let (Some(before), Ok(now)) = (origin, file.metadata().await) else {
        return 0;
    };
    if same_file(before, &now) && now.len() >= before.len() {
        before.len()
    } else {
        0
    }
}

/// True when `path` now names a different file than the one being read.
async fn rotated(tail: &LogTail, path: &Path) -> bool {
    let Ok(on_disk) = tokio::fs::metadata(path).await else {
        // Removed; keep reading the old handle until a new file appears.
        return false;
    };
    !tail
        .file
        .metadata()
        .await
        .is_ok_and(|current| same_file(&current, &on_disk))
}

async fn drain(tail: &mut LogTail, path: &Path, sink: &dyn ConsoleSink) -> io::Result<()> {
    match tail.read_available().await {
        Ok(lines) => {
            for line in lines {
                sink.push_line(line).await;
            }
            Ok(())
        }
        Err(e) => {
            sink.push_line(format!("Error reading log file {}: {e}", path.display()))
                .await;
            Err(e)
        }
    }
}

async fn run_tail(
    path: &Path,
    origin: Option<&Metadata>,
    sink: &dyn ConsoleSink,
    cancel: &CancellationToken,
) {
    let Some(file) = open_with_retry(path, cancel).await else {
        if !cancel.is_cancelled() {
            sink.push_line(format!(
                "Log file {} not found after {OPEN_ATTEMPTS} retries",
                path.display()
            ))
            .await;
        }
        return;
    };
    let offset = resume_offset(&file, origin).await;
    info!(path = %path.display(), offset, "Tailing log file");

    // Kept alive for the duration of the loop.
    let (_watcher, mut events) = watch_parent(path);
    let mut tail = LogTail::new(file);
    if let Err(e) = tail.skip_to(offset).await {
        warn!(path = %path.display(), error = %e, "Could not skip old log content");
    }
    let mut poll = tokio::time::interval(POLL_INTERVAL);

    loop {
        if drain(&mut tail, path, sink).await.is_err() {
            return;
        }

        if rotated(&tail, path).await {
            if let Ok(file) = File::open(path).await {
                debug!(path = %path.display(), "Log file rotated, reopening");
                if let Some(rest) = tail.take_partial() {
                    sink.push_line(rest).await;
                }
                tail = LogTail::new(file);
                continue;
            }
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            Some(event) = events.recv() => {
                if concerns(&event, path) {
                    debug!(kind = ?event.kind, "Log file changed");
                }
            }
            _ = poll.tick() => {}
        }
    }

    // Final drain so nothing written right before exit is lost.
    let _ = drain(&mut tail, path, sink).await;
}
