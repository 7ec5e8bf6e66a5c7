//! Delivery guarantees of the broadcast hub.

use std::sync::Arc;
use std::time::Duration;

use ssui_core::{ClutterFilter, Hub, HubConfig};
use tokio::time::Instant;

fn config(buffer_size: usize, send_timeout: Duration) -> HubConfig {
    HubConfig {
        max_clients: 8,
        buffer_size,
        send_timeout,
    }
}

#[tokio::test]
async fn stuck_client_delays_producer_by_at_most_the_timeout() {
    let hub = Arc::new(Hub::new("console", config(1, Duration::from_millis(100))));
    let _stuck = hub.subscribe().unwrap();
    let mut live = hub.subscribe().unwrap();

    let started = Instant::now();
    for i in 0..3 {
        hub.broadcast(format!("line {i}")).await;
        assert_eq!(live.recv().await, Some(format!("line {i}")));
    }

    // First line fits the stuck client's queue; the next two time out.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(hub.dropped_total(), 2);
}

#[tokio::test]
async fn subscribers_see_production_order() {
    let hub = Arc::new(Hub::new("console", config(128, Duration::from_millis(100))));
    let mut subs: Vec<_> = (0..3).map(|_| hub.subscribe().unwrap()).collect();

    for i in 0..100 {
        hub.broadcast(i.to_string()).await;
    }

    for sub in &mut subs {
        for i in 0..100 {
            assert_eq!(sub.recv().await, Some(i.to_string()));
        }
    }
}

#[tokio::test]
async fn late_subscriber_misses_earlier_messages() {
    let hub = Arc::new(Hub::new("console", config(16, Duration::from_millis(100))));
    hub.broadcast("before".to_string()).await;

    let mut sub = hub.subscribe().unwrap();
    hub.broadcast("after".to_string()).await;
    assert_eq!(sub.recv().await.as_deref(), Some("after"));
}

#[tokio::test]
async fn clutter_filter_drops_for_everyone() {
    let hub = Arc::new(
        Hub::new("console", config(16, Duration::from_millis(100))).with_filter(ClutterFilter::new()),
    );
    let mut sub = hub.subscribe().unwrap();

    hub.broadcast("WARNING: Shader Unsupported".to_string()).await;
    hub.broadcast("Client Foo (1) is ready!".to_string()).await;

    assert_eq!(sub.recv().await.as_deref(), Some("Client Foo (1) is ready!"));
    assert_eq!(sub.stats().delivered, 1);
}
