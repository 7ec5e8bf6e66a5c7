//! Per-consumer state: the subscription handle and delivery statistics.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::Serialize;
use tokio::sync::mpsc;

use super::Hub;

/// Delivery counters for one client.
#[derive(Debug)]
pub struct ClientStats {
    connected_at: DateTime<Utc>,
    last_seen_ms: AtomicI64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl ClientStats {
    pub(super) fn new() -> Self {
        let now = Utc::now();
        Self {
            connected_at: now,
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub(super) fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.last_seen_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub(super) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self, id: u64) -> ClientInfo {
        ClientInfo {
            id,
            connected_at: self.connected_at,
            last_seen: DateTime::from_timestamp_millis(self.last_seen_ms.load(Ordering::Relaxed))
                .unwrap_or(self.connected_at),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a client's delivery statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Hub-local client id.
    pub id: u64,
    /// When the subscription was created.
    pub connected_at: DateTime<Utc>,
    /// Last successful delivery (or subscription time).
    pub last_seen: DateTime<Utc>,
    /// Messages enqueued for this client.
    pub delivered: u64,
    /// Messages dropped because the queue stayed full.
    pub dropped: u64,
}

/// A live registration with a [`Hub`].
///
/// Dropping the subscription removes the client from the hub and closes
/// its queue. Removal is idempotent, so an explicit
/// [`Hub::unsubscribe`] followed by drop is harmless.
pub struct Subscription<T>
where
    T: Clone + Send + 'static,
{
    id: u64,
    receiver: mpsc::Receiver<T>,
    stats: Arc<ClientStats>,
    hub: Weak<Hub<T>>,
}

impl<T> std::fmt::Debug for Subscription<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<T> Subscription<T>
where
    T: Clone + Send + 'static,
{
    pub(super) const fn new(
        id: u64,
        receiver: mpsc::Receiver<T>,
        stats: Arc<ClientStats>,
        hub: Weak<Hub<T>>,
    ) -> Self {
        Self {
            id,
            receiver,
            stats,
            hub,
        }
    }

    /// Hub-local client id.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the client has been removed from the hub (or the
    /// hub itself is gone) and the queue is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Current statistics for this client.
    pub fn stats(&self) -> ClientInfo {
        self.stats.snapshot(self.id)
    }

    /// Turn the subscription into a stream; the client is removed when the
    /// stream is dropped.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static {
        futures_util::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|message| (message, sub))
        })
    }
}

impl<T> Drop for Subscription<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::HubConfig;
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_stats_track_deliveries() {
        let hub = Arc::new(Hub::new("stats", HubConfig::default()));
        let mut sub = hub.subscribe().unwrap();

        hub.broadcast(1_u32).await;
        hub.broadcast(2_u32).await;

        assert_eq!(sub.recv().await, Some(1));
        let info = sub.stats();
        assert_eq!(info.delivered, 2);
        assert_eq!(info.dropped, 0);
        assert!(info.last_seen >= info.connected_at);
    }

    #[tokio::test]
    async fn test_recv_ends_after_unsubscribe() {
        let hub = Arc::new(Hub::new("closing", HubConfig::default()));
        let mut sub = hub.subscribe().unwrap();
        hub.broadcast("pending".to_string()).await;

        hub.unsubscribe(sub.id());

        // Already-queued messages are still drained before the close is seen.
        assert_eq!(sub.recv().await.as_deref(), Some("pending"));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_stream_drop_unsubscribes() {
        let hub = Arc::new(Hub::new("stream", HubConfig::default()));
        let mut stream = Box::pin(hub.subscribe().unwrap().into_stream());
        hub.broadcast("x".to_string()).await;
        assert_eq!(stream.next().await.as_deref(), Some("x"));

        drop(stream);
        assert_eq!(hub.client_count(), 0);
    }
}
