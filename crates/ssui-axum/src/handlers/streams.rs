//! SSE handlers for the console and event hubs.
//!
//! Subscribing fails with 503 once a hub is at its client limit.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, Sse};
use futures_util::Stream;

use crate::error::HttpError;
use crate::sse::{console_stream, event_stream};
use crate::state::AppState;

/// Raw console output of the game server.
pub async fn console(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static>, HttpError> {
    let subscription = state.console.subscribe()?;
    Ok(console_stream(subscription, state.closing.clone()))
}

/// Classified server events as JSON.
pub async fn events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static>, HttpError> {
    let subscription = state.events.subscribe()?;
    Ok(event_stream(subscription, state.closing.clone()))
}
