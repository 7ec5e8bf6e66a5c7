//! Synchronous publishing into a hub.
//!
//! Detection handlers run synchronously on the classification loop and cannot
//! await a bounded broadcast. A [`HubPublisher`] queues messages into a relay
//! task which broadcasts them one at a time, preserving publish order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::Hub;

/// Cloneable, non-blocking handle that feeds a hub through a relay task.
///
/// The relay task ends once every publisher clone has been dropped.
pub struct HubPublisher<T> {
    sender: mpsc::UnboundedSender<T>,
}

impl<T> Clone for HubPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> HubPublisher<T>
where
    T: Clone + Send + 'static,
{
    pub(super) fn spawn(hub: Arc<Hub<T>>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<T>();
        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                hub.broadcast(message).await;
            }
            debug!(hub = %hub.name(), "Hub relay task exiting");
        });
        Self { sender }
    }

    /// Queue a message for broadcast. Never blocks.
    pub fn publish(&self, message: T) {
        if self.sender.send(message).is_err() {
            debug!("Hub relay task is gone, message discarded");
        }
    }
}
