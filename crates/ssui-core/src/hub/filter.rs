//! Pre-fan-out message filters.
//!
//! The dedicated server prints a steady stream of engine warnings that carry
//! no information for operators. The console hub drops them before they
//! reach any client unless clutter passthrough is enabled.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

/// Decides whether a message is delivered at all.
pub trait MessageFilter<T>: Send + Sync {
    /// Return `false` to drop the message for every client.
    fn admit(&self, message: &T) -> bool;
}

/// Substrings of known-noisy engine output.
const CLUTTER_MARKERS: &[&str] = &[
    "Setting linear velocity of a kinematic body is not supported",
    "Setting angular velocity of a kinematic body is not supported",
    "WARNING: Shader",
    "ERROR: Shader",
    "No mesh data available",
    "The image effect Main Camera",
    "Unsupported shader",
    "The shader",
    "memorysetup",
    "Microsoft Media Foundation video decoding",
    "The referenced script on this Behaviour",
    "Fallback handler could not load library",
];

/// How often the dropped-line summary is logged.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct DropCounter {
    pending: u64,
    last_summary: Option<Instant>,
}

/// Drops console lines containing any known clutter marker.
#[derive(Debug)]
pub struct ClutterFilter {
    markers: Vec<String>,
    counter: Mutex<DropCounter>,
}

impl ClutterFilter {
    /// Filter with the built-in marker list.
    pub fn new() -> Self {
        Self::with_markers(CLUTTER_MARKERS.iter().map(|m| (*m).to_string()))
    }

    /// Filter with a custom marker list.
    pub fn with_markers(markers: impl IntoIterator<Item = String>) -> Self {
        Self {
            markers: markers.into_iter().collect(),
            counter: Mutex::new(DropCounter {
                pending: 0,
                last_summary: None,
            }),
        }
    }

    fn is_clutter(&self, line: &str) -> bool {
        self.markers.iter().any(|m| line.contains(m.as_str()))
    }

    fn record_drop(&self) {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        counter.pending += 1;
        let due = counter
            .last_summary
            .is_none_or(|at| at.elapsed() >= SUMMARY_INTERVAL);
        if due {
            info!(
                dropped = counter.pending,
                "Dropped unhelpful game server log lines"
            );
            counter.pending = 0;
            counter.last_summary = Some(Instant::now());
        }
    }
}

impl Default for ClutterFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFilter<String> for ClutterFilter {
    fn admit(&self, message: &String) -> bool {
        if self.is_clutter(message) {
            self.record_drop();
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clutter_is_rejected() {
        let filter = ClutterFilter::new();
        assert!(!filter.admit(&"WARNING: Shader Unsupported: 'Hidden/Foo'".to_string()));
        assert!(!filter.admit(
            &"Setting linear velocity of a kinematic body is not supported.".to_string()
        ));
    }

    #[test]
    fn test_regular_lines_pass() {
        let filter = ClutterFilter::new();
        assert!(filter.admit(&"Client Foo (12345) is ready!".to_string()));
        assert!(filter.admit(&String::new()));
    }

    #[test]
    fn test_custom_markers() {
        let filter = ClutterFilter::with_markers(["noise".to_string()]);
        assert!(!filter.admit(&"some noise here".to_string()));
        assert!(filter.admit(&"WARNING: Shader".to_string()));
    }
}
