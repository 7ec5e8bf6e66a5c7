//! End-to-end classification behaviour of the detector.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ssui_core::{CustomDetection, DetectionType, Detector, EventKind, PlayerInfo};

fn custom(detection_type: DetectionType, pattern: &str, event_type: &str, message: &str) -> CustomDetection {
    CustomDetection {
        id: pattern.to_string(),
        detection_type,
        pattern: pattern.to_string(),
        event_type: EventKind::from(event_type),
        message: message.to_string(),
    }
}

#[test]
fn player_ready_yields_one_event_and_a_session() {
    let detector = Detector::new();
    let events = detector.process_log_message("Client Foo (12345) is ready!");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::PlayerReady);
    assert_eq!(
        events[0].player(),
        Some(&PlayerInfo {
            username: "Foo".to_string(),
            steam_id: "12345".to_string(),
        })
    );
    assert_eq!(
        detector.connected_players(),
        HashMap::from([("12345".to_string(), "Foo".to_string())])
    );
}

#[test]
fn disconnect_removes_the_session() {
    let detector = Detector::new();
    detector.process_log_message("Client Foo (12345) is ready!");
    detector.process_log_message("Client Bar (99) is ready!");

    let events = detector.process_log_message(
        "Client disconnected: 2 | Foo connectTime: 120,3s, ClientId: 12345",
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::PlayerDisconnect);

    let players = detector.connected_players();
    assert!(!players.contains_key("12345"));
    assert_eq!(players.get("99").map(String::as_str), Some("Bar"));
}

#[test]
fn connected_players_is_a_copy() {
    let detector = Detector::new();
    detector.process_log_message("Client Foo (1) is ready!");
    let mut copy = detector.connected_players();
    copy.clear();
    assert_eq!(detector.connected_players().len(), 1);
}

#[test]
fn custom_keyword_fires_verbatim() {
    let detector = Detector::new();
    detector.set_custom_patterns(&[custom(DetectionType::Keyword, "boom", "CUSTOM", "Boom detected")]);

    let events = detector.process_log_message("something went boom here");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Custom("CUSTOM".to_string()));
    assert_eq!(events[0].message, "Boom detected");

    assert!(detector.process_log_message("all quiet").is_empty());
}

#[test]
fn custom_regex_substitutes_groups() {
    let detector = Detector::new();
    detector.set_custom_patterns(&[custom(DetectionType::Regex, r"(\w+) says hi", "GREETING", "Hello {1}")]);

    let events = detector.process_log_message("bob says hi");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "Hello bob");
}

#[test]
fn replaced_patterns_never_fire_again() {
    let detector = Detector::new();
    detector.set_custom_patterns(&[custom(DetectionType::Keyword, "old", "OLD", "old")]);
    detector.set_custom_patterns(&[custom(DetectionType::Keyword, "new", "NEW", "new")]);

    assert!(detector.process_log_message("old").is_empty());
    assert_eq!(detector.process_log_message("new").len(), 1);
}

#[test]
fn stages_run_in_order_on_one_line() {
    let detector = Detector::new();
    detector.set_custom_patterns(&[custom(DetectionType::Keyword, "ready!", "CUSTOM", "custom")]);

    let order = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::PlayerReady, EventKind::Custom("CUSTOM".to_string())] {
        let order = Arc::clone(&order);
        detector.register_handler(kind.clone(), move |event| {
            order.lock().unwrap().push(event.kind.clone());
        });
    }

    detector.process_log_message("Client Foo (1) is ready!");
    assert_eq!(
        *order.lock().unwrap(),
        vec![EventKind::PlayerReady, EventKind::Custom("CUSTOM".to_string())]
    );
}

#[test]
fn exception_line_carries_stack_trace() {
    let detector = Detector::new();
    let line = "> 12:34:56: NullReferenceException: Object reference not set";
    let events = detector.process_log_message(line);

    let exception = events
        .iter()
        .find(|e| e.kind == EventKind::Exception)
        .expect("exception event");
    assert_eq!(exception.exception().unwrap().stack_trace, line);
}

#[test]
fn connecting_player_is_reported_without_a_session() {
    let detector = Detector::new();
    let events = detector.process_log_message("Client: Foo (123). Receiving");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::PlayerConnecting);
    assert_eq!(events[0].message, "Player is connecting");
    assert_eq!(
        events[0].player(),
        Some(&PlayerInfo {
            username: "Foo".to_string(),
            steam_id: "123".to_string(),
        })
    );
    assert_eq!(
        events[0].notice().as_deref(),
        Some("Player Foo (SteamID: 123) is connecting...")
    );
    assert!(detector.connected_players().is_empty());
}

#[test]
fn new_game_names_the_world() {
    let detector = Detector::new();
    let events = detector.process_log_message("Started new game in world Mars");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::NewGameStarted);
    assert_eq!(events[0].message, "New game started in world Mars");
    assert!(events[0].payload.is_none());
    assert_eq!(
        events[0].notice().as_deref(),
        Some("New game started in world Mars")
    );
}
