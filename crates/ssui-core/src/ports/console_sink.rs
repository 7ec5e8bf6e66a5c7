//! Console sink port for captured server output.
//!
//! This port abstracts the destination for lines read from the supervised
//! process (pipes or a tailed log file). The console [`Hub`](crate::hub::Hub)
//! is the production implementation; tests use an in-memory collector.

use async_trait::async_trait;

/// Port for pushing captured console lines downstream.
///
/// Implementations may await (e.g. bounded fan-out) but must never block
/// indefinitely: capture loops call this once per line.
#[async_trait]
pub trait ConsoleSink: Send + Sync {
    /// Push one line of output (without trailing newline).
    async fn push_line(&self, line: String);
}
