//! Broadcast hub: one producer stream fanned out to many consumers.
//!
//! Every subscriber gets its own bounded queue. [`Hub::broadcast`] first tries
//! a non-blocking enqueue for every client registered at call time; clients
//! whose queue is full are then waited on concurrently for at most
//! `send_timeout`, after which the message is dropped for that client alone.
//! A consumer that never drains can therefore delay the producer by one
//! timeout per message, but never stalls other consumers.
//!
//! Two instances exist at runtime with disjoint payload types: raw console
//! lines (`Hub<String>`) and classified events (`Hub<Event>`).

mod client;
mod filter;
mod publisher;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::ports::ConsoleSink;

pub use client::{ClientInfo, ClientStats, Subscription};
pub use filter::{ClutterFilter, MessageFilter};
pub use publisher::HubPublisher;

/// Default maximum number of concurrent subscribers per hub.
pub const DEFAULT_MAX_CLIENTS: usize = 20;

/// Default per-client queue capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 2000;

/// Default bounded wait before dropping a message for a full client.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors returned by hub operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HubError {
    /// The hub already serves its maximum number of clients.
    #[error("Too many clients (max {max})")]
    TooManyClients {
        /// Configured client limit.
        max: usize,
    },
}

/// Sizing and backpressure policy for a hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent subscriptions.
    pub max_clients: usize,
    /// Capacity of each client's queue.
    pub buffer_size: usize,
    /// How long a full client may hold up a single message.
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

struct ClientSlot<T> {
    sender: mpsc::Sender<T>,
    stats: Arc<ClientStats>,
    /// In-process consumer; not counted against `max_clients`.
    internal: bool,
}

/// Multi-consumer fan-out with per-client bounded queues.
pub struct Hub<T> {
    name: String,
    config: HubConfig,
    clients: Mutex<HashMap<u64, ClientSlot<T>>>,
    next_id: AtomicU64,
    dropped_total: AtomicU64,
    filter: Option<Box<dyn MessageFilter<T>>>,
}

impl<T> Hub<T>
where
    T: Clone + Send + 'static,
{
    /// Create a new hub.
    ///
    /// `name` only appears in diagnostics.
    pub fn new(name: impl Into<String>, config: HubConfig) -> Self {
        Self {
            name: name.into(),
            config,
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            dropped_total: AtomicU64::new(0),
            filter: None,
        }
    }

    /// Attach a filter that may reject messages before fan-out.
    #[must_use]
    pub fn with_filter(mut self, filter: impl MessageFilter<T> + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Hub name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration.
    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new client.
    ///
    /// The client is removed when the returned [`Subscription`] is dropped.
    pub fn subscribe(self: &Arc<Self>) -> Result<Subscription<T>, HubError> {
        let mut clients = self.lock_clients();
        let external = clients.values().filter(|slot| !slot.internal).count();
        if external >= self.config.max_clients {
            warn!(
                hub = %self.name,
                max = self.config.max_clients,
                "Rejecting subscription: too many clients"
            );
            return Err(HubError::TooManyClients {
                max: self.config.max_clients,
            });
        }
        Ok(self.register(&mut clients, false))
    }

    /// Register an in-process consumer that does not take one of the
    /// `max_clients` slots.
    pub fn subscribe_internal(self: &Arc<Self>) -> Subscription<T> {
        let mut clients = self.lock_clients();
        self.register(&mut clients, true)
    }

    fn register(
        self: &Arc<Self>,
        clients: &mut HashMap<u64, ClientSlot<T>>,
        internal: bool,
    ) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.config.buffer_size.max(1));
        let stats = Arc::new(ClientStats::new());
        clients.insert(
            id,
            ClientSlot {
                sender,
                stats: Arc::clone(&stats),
                internal,
            },
        );
        debug!(
            hub = %self.name,
            client_id = id,
            internal,
            clients = clients.len(),
            "Client subscribed"
        );
        Subscription::new(id, receiver, stats, Arc::downgrade(self))
    }

    /// Deliver `message` to every client registered at call time.
    ///
    /// Returns once every client has either accepted the message or timed
    /// out. Per-client order matches call order for a single producer.
    pub async fn broadcast(&self, message: T) {
        if let Some(filter) = &self.filter {
            if !filter.admit(&message) {
                return;
            }
        }

        let targets: Vec<(u64, mpsc::Sender<T>, Arc<ClientStats>)> = self
            .lock_clients()
            .iter()
            .map(|(id, slot)| (*id, slot.sender.clone(), Arc::clone(&slot.stats)))
            .collect();

        let mut pending = Vec::new();
        for (id, sender, stats) in targets {
            match sender.try_send(message.clone()) {
                Ok(()) => stats.record_delivery(),
                Err(TrySendError::Full(message)) => {
                    pending.push(self.deliver_with_timeout(id, sender, stats, message));
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(hub = %self.name, client_id = id, "Client closed during broadcast");
                }
            }
        }

        if !pending.is_empty() {
            join_all(pending).await;
        }
    }

    async fn deliver_with_timeout(
        &self,
        id: u64,
        sender: mpsc::Sender<T>,
        stats: Arc<ClientStats>,
        message: T,
    ) {
        match tokio::time::timeout(self.config.send_timeout, sender.send(message)).await {
            Ok(Ok(())) => stats.record_delivery(),
            Ok(Err(_)) => {
                debug!(hub = %self.name, client_id = id, "Client closed during broadcast");
            }
            Err(_) => {
                stats.record_drop();
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
                warn!(
                    hub = %self.name,
                    client_id = id,
                    timeout = ?self.config.send_timeout,
                    "Message dropped for slow client"
                );
            }
        }
    }

    /// Remove a client and close its queue.
    ///
    /// Returns `false` if the client was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.lock_clients().remove(&id).is_some();
        if removed {
            debug!(hub = %self.name, client_id = id, "Client unsubscribed");
        }
        removed
    }

    /// Number of currently registered clients.
    pub fn client_count(&self) -> usize {
        self.lock_clients().len()
    }

    /// Snapshot of per-client delivery statistics.
    pub fn clients(&self) -> Vec<ClientInfo> {
        let mut infos: Vec<ClientInfo> = self
            .lock_clients()
            .iter()
            .map(|(id, slot)| slot.stats.snapshot(*id))
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Total messages dropped across all clients since creation.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    /// Create a synchronous publishing handle backed by an ordered relay task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn publisher(self: &Arc<Self>) -> HubPublisher<T> {
        HubPublisher::spawn(Arc::clone(self))
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, HashMap<u64, ClientSlot<T>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ConsoleSink for Hub<String> {
    async fn push_line(&self, line: String) {
        self.broadcast(line).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(max_clients: usize, buffer_size: usize) -> Arc<Hub<String>> {
        Arc::new(Hub::new(
            "test",
            HubConfig {
                max_clients,
                buffer_size,
                send_timeout: Duration::from_millis(50),
            },
        ))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_clients_in_order() {
        let hub = hub(4, 16);
        let mut a = hub.subscribe().unwrap();
        let mut b = hub.subscribe().unwrap();

        hub.broadcast("one".to_string()).await;
        hub.broadcast("two".to_string()).await;

        assert_eq!(a.recv().await.as_deref(), Some("one"));
        assert_eq!(a.recv().await.as_deref(), Some("two"));
        assert_eq!(b.recv().await.as_deref(), Some("one"));
        assert_eq!(b.recv().await.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_subscribe_rejects_over_limit() {
        let hub = hub(1, 4);
        let _first = hub.subscribe().unwrap();
        assert_eq!(
            hub.subscribe().unwrap_err(),
            HubError::TooManyClients { max: 1 }
        );
    }

    #[tokio::test]
    async fn test_internal_subscription_keeps_client_slots_free() {
        let hub = hub(1, 4);
        let mut internal = hub.subscribe_internal();
        let mut external = hub.subscribe().unwrap();
        assert_eq!(hub.client_count(), 2);
        assert!(hub.subscribe().is_err());

        hub.broadcast("line".to_string()).await;
        assert_eq!(internal.recv().await.as_deref(), Some("line"));
        assert_eq!(external.recv().await.as_deref(), Some("line"));
    }

    #[tokio::test]
    async fn test_drop_frees_slot() {
        let hub = hub(1, 4);
        let first = hub.subscribe().unwrap();
        drop(first);
        assert_eq!(hub.client_count(), 0);
        assert!(hub.subscribe().is_ok());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let hub = hub(2, 4);
        let sub = hub.subscribe().unwrap();
        let id = sub.id();
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        // Dropping after explicit removal must not panic or double-close.
        drop(sub);
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_full_client_drops_after_timeout() {
        let hub = hub(2, 1);
        let _stuck = hub.subscribe().unwrap();
        let mut live = hub.subscribe().unwrap();

        hub.broadcast("first".to_string()).await;
        assert_eq!(live.recv().await.as_deref(), Some("first"));

        // `_stuck` still holds "first", so only it misses "second".
        hub.broadcast("second".to_string()).await;
        assert_eq!(live.recv().await.as_deref(), Some("second"));
        assert_eq!(hub.dropped_total(), 1);

        let stats = hub.clients();
        assert_eq!(stats[0].dropped, 1);
        assert_eq!(stats[1].dropped, 0);
    }

    #[tokio::test]
    async fn test_broadcast_without_clients_is_noop() {
        let hub = hub(2, 1);
        hub.broadcast("nobody".to_string()).await;
        assert_eq!(hub.dropped_total(), 0);
    }

    #[tokio::test]
    async fn test_console_sink_impl() {
        let hub = hub(2, 4);
        let mut sub = hub.subscribe().unwrap();
        hub.push_line("line".to_string()).await;
        assert_eq!(sub.recv().await.as_deref(), Some("line"));
    }
}
