//! Forwarding port for the log-stream bridge.
//!
//! The bridge that feeds the detector may also hand every raw console line to
//! an external notification sink (a chat bot log buffer, for instance). That
//! sink lives outside this workspace; this port is the seam.

/// Receives every console line seen by the detection bridge.
///
/// Called synchronously on the classification loop, so implementations must
/// be cheap (buffer and return).
pub trait LogForwarder: Send + Sync {
    /// Hand over one raw console line.
    fn forward(&self, line: &str);
}

/// No-op forwarder used when no external sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopForwarder;

impl LogForwarder for NoopForwarder {
    fn forward(&self, _line: &str) {}
}
