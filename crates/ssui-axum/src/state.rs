//! Shared application state type.

use crate::bootstrap::AxumContext;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// An Arc-wrapped `AxumContext` holding the supervisor, both hubs, the
/// detector and the custom detection store.
pub type AppState = Arc<AxumContext>;
