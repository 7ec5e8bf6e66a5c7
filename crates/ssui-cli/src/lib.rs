//! Command-line front end for the ssui supervisor.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by main.rs
use dotenvy as _;
use tokio as _;
use tracing as _;
use tracing_subscriber as _;

pub mod config;
pub mod parser;

pub use config::{load_settings, server_config};
pub use parser::{Cli, Commands};
