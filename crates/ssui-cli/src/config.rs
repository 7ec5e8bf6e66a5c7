//! Settings loading for the binary.

use std::path::Path;

use anyhow::{Context, Result};
use ssui_axum::{CorsConfig, ServerConfig};
use ssui_core::{Settings, validate_settings};

use crate::parser::Cli;

/// Read settings from `path`, or defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::with_defaults());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))
}

/// Apply command-line overrides and validate.
pub fn server_config(cli: &Cli) -> Result<ServerConfig> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        settings.http_port = Some(port);
    }
    validate_settings(&settings)?;

    let mut config = ServerConfig::from_settings(settings);
    if !cli.cors_origins.is_empty() {
        config.cors = CorsConfig::AllowOrigins(cli.cors_origins.clone());
    }
    Ok(config)
}
