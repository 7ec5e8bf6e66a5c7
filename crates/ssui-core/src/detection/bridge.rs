//! The single consumer loop feeding console lines into the detector.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use super::Detector;
use crate::hub::Subscription;
use crate::ports::LogForwarder;

/// Spawn the log bridge.
///
/// Every line received on `subscription` is handed to `forwarder` and then
/// classified, strictly in arrival order. The task ends when the
/// subscription closes.
pub fn spawn_log_bridge(
    detector: Arc<Detector>,
    mut subscription: Subscription<String>,
    forwarder: Arc<dyn LogForwarder>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(client_id = subscription.id(), "Log bridge started");
        while let Some(line) = subscription.recv().await {
            forwarder.forward(&line);
            detector.process_log_message(&line);
        }
        debug!("Log bridge stopped");
    })
}
