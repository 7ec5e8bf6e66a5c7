//! Classified events produced by the detection engine.
//!
//! # Wire Format
//!
//! Events are streamed to browsers as JSON:
//!
//! ```json
//! {
//!   "type": "PLAYER_READY",
//!   "message": "Player is ready",
//!   "rawLog": "Client Foo (12345) is ready!",
//!   "timestamp": "2025-01-01T12:00:00Z",
//!   "payload": { "kind": "player", "username": "Foo", "steamId": "12345" }
//! }
//! ```

mod kind;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use kind::EventKind;

/// A player named in a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub username: String,
    pub steam_id: String,
}

/// Backup slot written by a world save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub backup_index: String,
}

/// Exception text captured from the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    pub stack_trace: String,
}

/// Structured data extracted alongside an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Player(PlayerInfo),
    Backup(BackupInfo),
    Exception(ExceptionInfo),
}

/// One classified console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub raw_log: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

impl Event {
    /// Event stamped with the current time and no payload.
    pub fn new(kind: EventKind, message: impl Into<String>, raw_log: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_log: raw_log.into(),
            timestamp: Utc::now(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub const fn player(&self) -> Option<&PlayerInfo> {
        match &self.payload {
            Some(EventPayload::Player(info)) => Some(info),
            _ => None,
        }
    }

    pub const fn backup(&self) -> Option<&BackupInfo> {
        match &self.payload {
            Some(EventPayload::Backup(info)) => Some(info),
            _ => None,
        }
    }

    pub const fn exception(&self) -> Option<&ExceptionInfo> {
        match &self.payload {
            Some(EventPayload::Exception(info)) => Some(info),
            _ => None,
        }
    }

    /// Human-readable operator notice for this event.
    ///
    /// Returns `None` for player and save events whose payload is missing,
    /// which only happens for events built by hand.
    pub fn notice(&self) -> Option<String> {
        let text = match &self.kind {
            EventKind::ServerReady => "Server is ready to connect!".to_string(),
            EventKind::ServerStarting => "Server is starting up...".to_string(),
            EventKind::ServerError => "Server error detected".to_string(),
            EventKind::ServerRunning => "Server process has started!".to_string(),
            EventKind::PlayerConnecting => {
                let p = self.player()?;
                format!("Player {} (SteamID: {}) is connecting...", p.username, p.steam_id)
            }
            EventKind::PlayerReady => {
                let p = self.player()?;
                format!("Player {} (SteamID: {}) is ready!", p.username, p.steam_id)
            }
            EventKind::PlayerDisconnect => {
                format!("Player {} disconnected", self.player()?.username)
            }
            EventKind::WorldSaved => format!(
                "World Saved: BackupIndex: {} UTC Time: {}",
                self.backup()?.backup_index,
                self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
            EventKind::Exception => match self.exception() {
                Some(info) if !info.stack_trace.is_empty() => format!(
                    "Exception detected! Stack Trace: {}",
                    info.stack_trace.replace('\n', " | ")
                ),
                _ => "Exception detected!".to_string(),
            },
            EventKind::SettingsChanged | EventKind::ServerHosted | EventKind::NewGameStarted => {
                self.message.clone()
            }
            EventKind::CustomDetection | EventKind::Custom(_) => {
                format!("[Custom Detection] {}", self.message)
            }
        };
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_event(kind: EventKind) -> Event {
        Event::new(kind, "Player is ready", "raw").with_payload(EventPayload::Player(PlayerInfo {
            username: "Foo".to_string(),
            steam_id: "12345".to_string(),
        }))
    }

    #[test]
    fn test_player_notice() {
        assert_eq!(
            player_event(EventKind::PlayerReady).notice().as_deref(),
            Some("Player Foo (SteamID: 12345) is ready!")
        );
        assert_eq!(
            player_event(EventKind::PlayerDisconnect).notice().as_deref(),
            Some("Player Foo disconnected")
        );
    }

    #[test]
    fn test_missing_payload_has_no_notice() {
        let event = Event::new(EventKind::PlayerReady, "Player is ready", "raw");
        assert!(event.notice().is_none());
    }

    #[test]
    fn test_exception_notice_flattens_trace() {
        let event = Event::new(EventKind::Exception, "Exception detected", "raw").with_payload(
            EventPayload::Exception(ExceptionInfo {
                stack_trace: "first\nsecond".to_string(),
            }),
        );
        assert_eq!(
            event.notice().as_deref(),
            Some("Exception detected! Stack Trace: first | second")
        );
    }

    #[test]
    fn test_wire_format() {
        let event = player_event(EventKind::PlayerReady);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PLAYER_READY");
        assert_eq!(json["rawLog"], "raw");
        assert_eq!(json["payload"]["kind"], "player");
        assert_eq!(json["payload"]["steamId"], "12345");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
