//! Detection engine: turns raw console lines into typed [`Event`]s.
//!
//! Every line runs through three stages, all unconditionally:
//!
//! 1. **Keywords** - fixed substring markers (`"Ready"`, `"EXCEPTION"`, ...).
//!    Each hit fires its own event.
//! 2. **Rules** - built-in regexes with dedicated extraction (players,
//!    saves, exceptions, settings, hosting, new game). Player rules also
//!    maintain the connected-player map.
//! 3. **Custom patterns** - user-supplied regex or keyword detections,
//!    hot-swapped as a whole via [`Detector::set_custom_patterns`].
//!
//! Each produced event is dispatched to the handlers registered for its tag
//! synchronously, in registration order, before the next event is built.
//! Handlers run on the classification loop; a slow handler delays every
//! following line.

mod bridge;
mod custom;
mod handlers;
mod rules;
mod store;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::debug;

use crate::events::{Event, EventKind};
use rules::{KEYWORDS, RULES, SessionChange};

pub use bridge::spawn_log_bridge;
pub use custom::{CustomDetection, CustomPattern, DetectionType, format_message};
pub use handlers::register_default_handlers;
pub use store::CustomDetectionStore;

/// Errors from custom detection management.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Detection not found: {0}")]
    NotFound(String),

    #[error("Custom detection storage error: {0}")]
    Storage(String),
}

/// Callback invoked for every event of one tag.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Stateful line classifier.
///
/// Shared as `Arc<Detector>`. Only the log bridge should call
/// [`process_log_message`](Self::process_log_message) in production so that
/// session updates stay line-ordered.
#[derive(Default)]
pub struct Detector {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
    sessions: RwLock<HashMap<String, String>>,
    custom: RwLock<Arc<[CustomPattern]>>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `kind`.
    pub fn register_handler<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Classify one line, dispatching and returning every event it produced.
    pub fn process_log_message(&self, line: &str) -> Vec<Event> {
        let mut produced = Vec::new();

        for (marker, kind) in KEYWORDS {
            if line.contains(marker) {
                let event = Event::new(
                    kind.clone(),
                    format!("Server event detected: {kind}"),
                    line,
                );
                self.emit(event, &mut produced);
            }
        }

        for rule in RULES.iter() {
            if let Some(caps) = rule.regex.captures(line) {
                let (event, change) = (rule.build)(&caps, line);
                self.apply_session_change(change);
                self.emit(event, &mut produced);
            }
        }

        // One snapshot per line: a concurrent swap applies from the next line.
        let custom = Arc::clone(&self.custom.read().unwrap_or_else(PoisonError::into_inner));
        for pattern in custom.iter() {
            if let Some(message) = pattern.apply(line) {
                self.emit(Event::new(pattern.kind().clone(), message, line), &mut produced);
            }
        }

        produced
    }

    /// Copy of the connected-player map (`steam id -> name`).
    pub fn connected_players(&self) -> HashMap<String, String> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget every tracked session. Called when the server (re)starts.
    pub fn clear_connected_players(&self) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Replace the active custom pattern set.
    ///
    /// Detections whose regex does not compile are skipped. Returns the
    /// number of patterns now active.
    pub fn set_custom_patterns(&self, detections: &[CustomDetection]) -> usize {
        let compiled: Arc<[CustomPattern]> = detections
            .iter()
            .filter_map(|detection| match CustomPattern::compile(detection) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    debug!(id = %detection.id, error = %e, "Skipping custom detection");
                    None
                }
            })
            .collect();
        let active = compiled.len();
        *self.custom.write().unwrap_or_else(PoisonError::into_inner) = compiled;
        debug!(active, "Custom detection patterns replaced");
        active
    }

    fn apply_session_change(&self, change: SessionChange) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match change {
            SessionChange::None => {}
            SessionChange::Upsert { steam_id, username } => {
                sessions.insert(steam_id, username);
            }
            SessionChange::Remove { steam_id } => {
                sessions.remove(&steam_id);
            }
        }
    }

    fn emit(&self, event: Event, produced: &mut Vec<Event>) {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();
        for handler in &handlers {
            handler(&event);
        }
        produced.push(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_keyword_hits_fire_independently() {
        let detector = Detector::new();
        let events = detector.process_log_message("Ready EXCEPTION");
        let kinds: Vec<_> = events.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(kinds, vec![EventKind::ServerReady, EventKind::ServerError]);
        assert_eq!(events[0].message, "Server event detected: SERVER_READY");
    }

    #[test]
    fn test_unmatched_line_produces_nothing() {
        let detector = Detector::new();
        assert!(detector.process_log_message("just some output").is_empty());
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let detector = Detector::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            detector.register_handler(EventKind::ServerReady, move |_| {
                seen.lock().unwrap().push(tag);
            });
        }
        detector.process_log_message("Server Ready");
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_settings_and_hosting_messages() {
        let detector = Detector::new();
        let events =
            detector.process_log_message("12:00:01: Changed setting 'MaxPlayers' from '4' to '8'");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Setting MaxPlayers changed from 4 to 8");

        let events = detector
            .process_log_message("RocketNet Succesfully hosted with Address: 0.0.0.0 Port: 27016");
        assert_eq!(events[0].kind, EventKind::ServerHosted);
        assert_eq!(events[0].message, "RocketNet Server hosted at 0.0.0.0:27016");
    }

    #[test]
    fn test_world_saved_payload() {
        let detector = Detector::new();
        let events = detector.process_log_message("World Saved: Mars, BackupIndex: 7");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].backup().unwrap().backup_index, "7");
    }

    #[test]
    fn test_invalid_custom_pattern_is_skipped() {
        let detector = Detector::new();
        let detections = vec![
            CustomDetection {
                id: "bad".to_string(),
                detection_type: DetectionType::Regex,
                pattern: "(".to_string(),
                event_type: EventKind::CustomDetection,
                message: "never".to_string(),
            },
            CustomDetection {
                id: "good".to_string(),
                detection_type: DetectionType::Keyword,
                pattern: "boom".to_string(),
                event_type: EventKind::CustomDetection,
                message: "Boom".to_string(),
            },
        ];
        assert_eq!(detector.set_custom_patterns(&detections), 1);
        assert_eq!(detector.process_log_message("boom").len(), 1);
    }

    #[test]
    fn test_clear_connected_players() {
        let detector = Detector::new();
        detector.process_log_message("Client Foo (1) is ready!");
        assert_eq!(detector.connected_players().len(), 1);
        detector.clear_connected_players();
        assert!(detector.connected_players().is_empty());
    }
}
