//! Hub subscriptions as `text/event-stream` responses.
//!
//! Each stream opens with a connection acknowledgement frame, then carries
//! one `data:` frame per broadcast until the client disconnects or the
//! server begins shutting down. Dropping the response stream drops the
//! subscription, which removes the client from its hub.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use ssui_core::{Event, Subscription};
use tokio_util::sync::CancellationToken;

/// Keep-alive interval for idle streams.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

fn hub_stream<T, F>(
    subscription: Subscription<T>,
    greeting: &'static str,
    closing: CancellationToken,
    render: F,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static>
where
    T: Clone + Send + 'static,
    F: Fn(T) -> Option<SseEvent> + Send + 'static,
{
    let hello = stream::once(async move { SseEvent::default().data(greeting) });
    let body = subscription
        .into_stream()
        .filter_map(move |message| std::future::ready(render(message)));
    let frames = hello
        .chain(body)
        .take_until(closing.cancelled_owned())
        .map(Ok);

    Sse::new(frames).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("ping"))
}

/// Raw console lines, one frame per line.
pub fn console_stream(
    subscription: Subscription<String>,
    closing: CancellationToken,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static> {
    hub_stream(subscription, "Console Stream Connected", closing, |line| {
        // A bare carriage return would end the frame early.
        let line = if line.contains('\r') {
            line.replace('\r', "")
        } else {
            line
        };
        Some(SseEvent::default().data(line))
    })
}

/// Classified events as JSON, one frame per event.
pub fn event_stream(
    subscription: Subscription<Event>,
    closing: CancellationToken,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static> {
    hub_stream(subscription, "Event Stream Connected", closing, |event| {
        match serde_json::to_string(&event) {
            Ok(json) => Some(SseEvent::default().data(json)),
            Err(e) => {
                tracing::warn!("Failed to serialize event: {}", e);
                None
            }
        }
    })
}
