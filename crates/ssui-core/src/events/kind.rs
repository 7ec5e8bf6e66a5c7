//! Event tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tag identifying what a classified event means.
///
/// The built-in tags are produced by the detector's keyword and regex
/// stages. Custom detections may target any tag, including ones not known
/// here, which map to [`EventKind::Custom`].
///
/// On the wire a tag is its `SCREAMING_SNAKE_CASE` name, e.g. `"PLAYER_READY"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    ServerReady,
    ServerStarting,
    ServerError,
    ServerRunning,
    PlayerConnecting,
    PlayerReady,
    PlayerDisconnect,
    WorldSaved,
    Exception,
    SettingsChanged,
    ServerHosted,
    NewGameStarted,
    /// Default tag for user-defined detections.
    CustomDetection,
    /// Any other user-defined tag.
    Custom(String),
}

impl EventKind {
    /// Every built-in tag, in declaration order.
    pub const BUILTIN: [Self; 13] = [
        Self::ServerReady,
        Self::ServerStarting,
        Self::ServerError,
        Self::ServerRunning,
        Self::PlayerConnecting,
        Self::PlayerReady,
        Self::PlayerDisconnect,
        Self::WorldSaved,
        Self::Exception,
        Self::SettingsChanged,
        Self::ServerHosted,
        Self::NewGameStarted,
        Self::CustomDetection,
    ];

    /// Wire name of the tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ServerReady => "SERVER_READY",
            Self::ServerStarting => "SERVER_STARTING",
            Self::ServerError => "SERVER_ERROR",
            Self::ServerRunning => "SERVER_RUNNING",
            Self::PlayerConnecting => "PLAYER_CONNECTING",
            Self::PlayerReady => "PLAYER_READY",
            Self::PlayerDisconnect => "PLAYER_DISCONNECT",
            Self::WorldSaved => "WORLD_SAVED",
            Self::Exception => "EXCEPTION",
            Self::SettingsChanged => "SETTINGS_CHANGED",
            Self::ServerHosted => "SERVER_HOSTED",
            Self::NewGameStarted => "NEW_GAME_STARTED",
            Self::CustomDetection => "CUSTOM_DETECTION",
            Self::Custom(name) => name.as_str(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::BUILTIN
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .unwrap_or_else(|| Self::Custom(value.to_string()))
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_parse_back() {
        for kind in EventKind::BUILTIN {
            assert_eq!(EventKind::from(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_unknown_name_is_custom() {
        assert_eq!(
            EventKind::from("CUSTOM"),
            EventKind::Custom("CUSTOM".to_string())
        );
        assert_eq!(EventKind::Custom("BOOM".to_string()).to_string(), "BOOM");
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&EventKind::PlayerReady).unwrap();
        assert_eq!(json, "\"PLAYER_READY\"");
        let kind: EventKind = serde_json::from_str("\"WORLD_SAVED\"").unwrap();
        assert_eq!(kind, EventKind::WorldSaved);
    }
}
