//! HTTP request handlers for the Axum web server.
//!
//! Each submodule contains handlers for a specific API area. Handlers are
//! thin wrappers over the services held in `AxumContext`.

pub mod detections;
pub mod server;
pub mod streams;
