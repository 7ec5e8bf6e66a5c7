//! Built-in keyword and regex rules.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::events::{BackupInfo, Event, EventKind, EventPayload, ExceptionInfo, PlayerInfo};

/// Substring markers, checked in this order. Every hit fires.
pub(super) const KEYWORDS: &[(&str, EventKind)] = &[
    ("Ready", EventKind::ServerReady),
    ("Unloading 1 Unused Serialized files", EventKind::ServerStarting),
    ("EXCEPTION", EventKind::ServerError),
    ("Initialize engine version", EventKind::ServerRunning),
];

/// Session mutation requested by a rule.
pub(super) enum SessionChange {
    None,
    Upsert { steam_id: String, username: String },
    Remove { steam_id: String },
}

pub(super) struct Rule {
    pub(super) regex: Regex,
    pub(super) build: fn(&Captures<'_>, &str) -> (Event, SessionChange),
}

fn group(caps: &Captures<'_>, i: usize) -> String {
    caps.get(i).map_or_else(String::new, |m| m.as_str().to_string())
}

fn player(kind: EventKind, message: &str, caps: &Captures<'_>, line: &str) -> Event {
    Event::new(kind, message, line).with_payload(EventPayload::Player(PlayerInfo {
        username: group(caps, 1),
        steam_id: group(caps, 2),
    }))
}

fn compile(pattern: &str, build: fn(&Captures<'_>, &str) -> (Event, SessionChange)) -> Rule {
    Rule {
        // Patterns are literals covered by unit tests.
        regex: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}")),
        build,
    }
}

/// Extraction rules, evaluated in this order against every line.
pub(super) static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        compile(r"Client\s+(.+)\s+\((\d+)\)\s+is\s+ready!", |caps, line| {
            let event = player(EventKind::PlayerReady, "Player is ready", caps, line);
            let change = SessionChange::Upsert {
                steam_id: group(caps, 2),
                username: group(caps, 1),
            };
            (event, change)
        }),
        compile(r"Client:?\s+(.+?)\s+\((\d+)\)\.\s+Receiving", |caps, line| {
            (
                player(EventKind::PlayerConnecting, "Player is connecting", caps, line),
                SessionChange::None,
            )
        }),
        compile(
            r"Client\s+disconnected:\s+\d+\s+\|\s+(.+)\s+connectTime:\s+\d+,\d+s,\s+ClientId:\s+(\d+)",
            |caps, line| {
                let event = player(EventKind::PlayerDisconnect, "Player disconnected", caps, line);
                (event, SessionChange::Remove { steam_id: group(caps, 2) })
            },
        ),
        compile(r"World Saved:\s.*,\sBackupIndex:\s(\d+)", |caps, line| {
            let event = Event::new(EventKind::WorldSaved, "World saved", line).with_payload(
                EventPayload::Backup(BackupInfo {
                    backup_index: group(caps, 1),
                }),
            );
            (event, SessionChange::None)
        }),
        compile(
            r"(?m)^\s*>\s*\d{2}:\d{2}:\d{2}:.*Exception.*|>\s+\d{2}:\d{2}:\d{2}:.*StackTrace",
            |_, line| {
                let event = Event::new(EventKind::Exception, "Exception detected", line).with_payload(
                    EventPayload::Exception(ExceptionInfo {
                        stack_trace: line.to_string(),
                    }),
                );
                (event, SessionChange::None)
            },
        ),
        compile(
            r"\d{2}:\d{2}:\d{2}: Changed setting '(.+?)' from '(.+?)' to '(.+?)'",
            |caps, line| {
                let message = format!(
                    "Setting {} changed from {} to {}",
                    group(caps, 1),
                    group(caps, 2),
                    group(caps, 3)
                );
                (
                    Event::new(EventKind::SettingsChanged, message, line),
                    SessionChange::None,
                )
            },
        ),
        compile(
            r"RocketNet Succesfully hosted with Address: (.+?) Port: (\d+)",
            |caps, line| {
                let message = format!(
                    "RocketNet Server hosted at {}:{}",
                    group(caps, 1),
                    group(caps, 2)
                );
                (
                    Event::new(EventKind::ServerHosted, message, line),
                    SessionChange::None,
                )
            },
        ),
        compile(r"Started new game in world (.+)", |caps, line| {
            let message = format!("New game started in world {}", group(caps, 1));
            (
                Event::new(EventKind::NewGameStarted, message, line),
                SessionChange::None,
            )
        }),
    ]
});
