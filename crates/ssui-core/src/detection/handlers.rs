//! Default event handlers: log a notice and forward the event to the event hub.

use tracing::info;

use super::Detector;
use crate::events::{Event, EventKind};
use crate::hub::HubPublisher;

/// Register the default handler for every built-in tag.
///
/// Custom detections targeting a tag outside [`EventKind::BUILTIN`] are still
/// classified but need their own handler to be published.
pub fn register_default_handlers(detector: &Detector, publisher: &HubPublisher<Event>) {
    for kind in EventKind::BUILTIN {
        let publisher = publisher.clone();
        detector.register_handler(kind, move |event: &Event| {
            let Some(notice) = event.notice() else {
                return;
            };
            info!(target: "ssui::detection", kind = %event.kind, "{notice}");
            publisher.publish(event.clone());
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::hub::{Hub, HubConfig};

    #[tokio::test]
    async fn test_events_reach_event_hub() {
        let hub = Arc::new(Hub::new("events", HubConfig::default()));
        let mut sub = hub.subscribe().unwrap();
        let detector = Detector::new();
        register_default_handlers(&detector, &hub.publisher());

        detector.process_log_message("Client Foo (12345) is ready!");

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::PlayerReady);
        assert_eq!(
            event.notice().as_deref(),
            Some("Player Foo (SteamID: 12345) is ready!")
        );
    }
}
