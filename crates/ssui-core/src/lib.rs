//! Core domain for the ssui game-server supervisor.
//!
//! - [`hub`]: bounded, drop-on-timeout fan-out used for console lines and
//!   classified events
//! - [`detection`]: the stateful log classifier and custom detection store
//! - [`events`]: the classified event model
//! - [`ports`]: traits implemented by runtime adapters, plus the error taxonomy
//! - [`settings`]: supervisor settings and validation
//!
//! Nothing here touches OS processes; see `ssui-runtime`.

#![deny(unused_crate_dependencies)]

pub mod detection;
pub mod events;
pub mod hub;
pub mod ports;
pub mod settings;

pub use detection::{
    CustomDetection, CustomDetectionStore, CustomPattern, DetectionError, DetectionType, Detector,
    Handler, register_default_handlers, spawn_log_bridge,
};
pub use events::{BackupInfo, Event, EventKind, EventPayload, ExceptionInfo, PlayerInfo};
pub use hub::{
    ClientInfo, ClutterFilter, Hub, HubConfig, HubError, HubPublisher, MessageFilter, Subscription,
};
pub use ports::{ConsoleSink, CoreError, LogForwarder, NoopForwarder, ProcessError};
pub use settings::{DEFAULT_HTTP_PORT, Settings, SettingsError, validate_settings};

#[cfg(test)]
use tokio_test as _;
