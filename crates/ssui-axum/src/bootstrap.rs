//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where the hubs, the detector, the custom
//! detection store and the supervisor are wired together.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use ssui_core::{
    ClutterFilter, ConsoleSink, CustomDetectionStore, Detector, Event, Hub, NoopForwarder,
    Settings, register_default_handlers, spawn_log_bridge, validate_settings,
};
use ssui_runtime::{Supervisor, SupervisorConfig, native};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Supervisor, hub and detection settings.
    pub settings: Settings,
}

impl ServerConfig {
    /// Config derived from `settings`, allowing all origins.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            port: settings.effective_http_port(),
            cors: CorsConfig::default(),
            settings,
        }
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    /// Raw console lines from the supervised server.
    pub console: Arc<Hub<String>>,
    /// Classified detection events.
    pub events: Arc<Hub<Event>>,
    pub detector: Arc<Detector>,
    pub detections: Arc<CustomDetectionStore>,
    pub supervisor: Arc<Supervisor>,
    pub settings: Settings,
    /// Cancelled when the server shuts down; ends every open stream.
    pub closing: CancellationToken,
    bridge: JoinHandle<()>,
}

impl AxumContext {
    /// Stop the supervised server, end open streams and stop the log bridge.
    pub async fn shutdown(&self) {
        self.closing.cancel();
        self.supervisor.shutdown().await;
        self.bridge.abort();
        info!("ssui context shut down");
    }
}

/// Build every service from `settings`.
pub async fn bootstrap(settings: Settings) -> Result<AxumContext> {
    validate_settings(&settings)?;

    let hub_config = settings.hub_config();
    let console_hub = Hub::new("console", hub_config.clone());
    let console = Arc::new(if settings.log_clutter_to_console() {
        console_hub
    } else {
        console_hub.with_filter(ClutterFilter::new())
    });
    let events = Arc::new(Hub::new("events", hub_config));

    let detector = Arc::new(Detector::new());
    register_default_handlers(&detector, &events.publisher());

    let detections = Arc::new(
        CustomDetectionStore::open(
            settings.effective_custom_detections_path(),
            Arc::clone(&detector),
        )
        .await?,
    );

    let bridge = spawn_log_bridge(
        Arc::clone(&detector),
        console.subscribe_internal(),
        Arc::new(NoopForwarder),
    );

    let supervisor_config = SupervisorConfig::from(&settings);
    info!(
        capture = ?supervisor_config.capture,
        stop_grace = ?supervisor_config.stop_grace,
        kill_grace = ?supervisor_config.kill_grace,
        "Supervisor configured"
    );
    // Sessions are reset by Start itself: after the previous run's output has
    // been captured and before the new process exists, so no line of the new
    // run can be classified ahead of the reset.
    let session_reset = Arc::clone(&detector);
    let supervisor = Arc::new(
        Supervisor::new(
            native(),
            Arc::clone(&console) as Arc<dyn ConsoleSink>,
            supervisor_config,
        )
        .with_start_hook(move || session_reset.clear_connected_players()),
    );

    Ok(AxumContext {
        console,
        events,
        detector,
        detections,
        supervisor,
        settings,
        closing: CancellationToken::new(),
        bridge,
    })
}

/// Bootstrap, serve until `shutdown` resolves, then stop the game server.
pub async fn start_server(
    config: ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let ctx = Arc::new(bootstrap(config.settings.clone()).await?);
    let app = crate::routes::create_router(Arc::clone(&ctx), &config.cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("ssui web server listening on http://{}", addr);

    let closing = ctx.closing.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutdown requested");
            closing.cancel();
        })
        .await?;

    ctx.shutdown().await;
    Ok(())
}
