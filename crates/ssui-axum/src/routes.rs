//! Route definitions and router construction.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::CorsConfig;
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// API routes without the `/api` prefix (nested under `/api` by the caller).
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        // Server lifecycle
        .route("/v2/server/start", post(handlers::server::start))
        .route("/v2/server/stop", post(handlers::server::stop))
        .route("/v2/server/status", get(handlers::server::status))
        .route("/v2/players", get(handlers::server::players))
        // Custom detections
        .route(
            "/v2/custom-detections",
            get(handlers::detections::list).post(handlers::detections::add),
        )
        .route(
            "/v2/custom-detections/{id}",
            delete(handlers::detections::delete),
        )
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the main application router.
pub fn create_router(state: AppState, cors_config: &CorsConfig) -> Router {
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .route("/console", get(handlers::streams::console))
        .route("/events", get(handlers::streams::events))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
