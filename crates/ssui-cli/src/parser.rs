//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface for the game server supervisor.
#[derive(Parser)]
#[command(name = "ssui")]
#[command(about = "Supervise a dedicated game server and stream its console")]
#[command(version)]
pub struct Cli {
    /// JSON settings file
    #[arg(short = 'c', long = "config", env = "SSUI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Override the HTTP port from the settings file
    #[arg(short = 'p', long = "port", env = "SSUI_PORT", global = true)]
    pub port: Option<u16>,

    /// Restrict CORS to these origins (repeatable). All origins allowed when unset.
    #[arg(long = "cors-origin", global = true)]
    pub cors_origins: Vec<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API and supervise the server (default)
    Serve,
    /// Validate the settings and print the effective configuration
    CheckConfig,
}
