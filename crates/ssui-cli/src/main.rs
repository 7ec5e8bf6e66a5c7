//! CLI entry point.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ssui_cli::{Cli, Commands, server_config};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads SSUI_* values
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = server_config(&cli)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!(port = config.port, "Starting ssui");
            ssui_axum::start_server(config, shutdown_signal()).await?;
        }
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config.settings)?);
            println!("Settings OK");
        }
    }

    Ok(())
}
