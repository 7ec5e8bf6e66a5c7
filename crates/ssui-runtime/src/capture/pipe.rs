//! Async pipe line readers (non-UTF8-safe).
//!
//! Game servers can emit non-UTF8 bytes on stdout/stderr. `BufReader::lines()`
//! would end the reader on the first invalid byte, so lines are read as bytes
//! and decoded lossily.

use std::sync::Arc;

use ssui_core::ConsoleSink;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn a reader forwarding every line of `stream` into `sink`.
///
/// The task exits silently on EOF or cancellation. A read error is pushed
/// into the sink as a diagnostic line before the task exits.
pub fn spawn_pipe_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
    sink: Arc<dyn ConsoleSink>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            let read = tokio::select! {
                () = cancel.cancelled() => break,
                read = reader.read_until(b'\n', &mut buf) => read,
            };
            match read {
                Ok(0) => break,
                Ok(_) => {
                    let line = decode_line(&mut buf);
                    sink.push_line(line).await;
                }
                Err(e) => {
                    debug!(%stream_type, error = %e, "Pipe reader exiting due to read error");
                    sink.push_line(format!("Error reading {stream_type} pipe: {e}"))
                        .await;
                    break;
                }
            }
        }

        debug!(%stream_type, "Pipe reader task exiting");
    })
}

/// Strip the trailing newline (and carriage return) and decode lossily.
pub(crate) fn decode_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    String::from_utf8_lossy(buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CollectingSink;

    #[test]
    fn test_decode_line_trims_crlf() {
        let mut buf = b"hello\r\n".to_vec();
        assert_eq!(decode_line(&mut buf), "hello");
        let mut buf = b"no newline".to_vec();
        assert_eq!(decode_line(&mut buf), "no newline");
    }

    #[test]
    fn test_decode_line_is_lossy() {
        let mut buf = vec![b'a', 0xff, b'b', b'\n'];
        assert_eq!(decode_line(&mut buf), "a\u{fffd}b");
    }

    #[tokio::test]
    async fn test_reader_forwards_lines_until_eof() {
        let sink = Arc::new(CollectingSink::default());
        let input: &[u8] = b"first\nsecond\r\nlast without newline";

        spawn_pipe_reader(input, "stdout", sink.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            sink.lines(),
            vec!["first", "second", "last without newline"]
        );
    }

    #[tokio::test]
    async fn test_reader_stops_on_cancel() {
        let sink = Arc::new(CollectingSink::default());
        let (_writer, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();

        let handle = spawn_pipe_reader(reader, "stderr", sink.clone(), cancel.clone());
        cancel.cancel();
        handle.await.unwrap();
        assert!(sink.lines().is_empty());
    }
}
