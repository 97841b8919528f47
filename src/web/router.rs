//! Router configuration for the web API.

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::handlers::{create_room, delete_room, get_room, list_rooms, stats, AppState};
use super::ws::ws_handler;

/// Create the main router.
pub fn create_router(app_state: Arc<AppState>, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms", post(create_room))
        .route("/rooms/:id", get(get_room))
        .route("/rooms/:id", delete(delete_room))
        .route("/stats", get(stats));

    let mut router = Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins)),
        )
        .with_state(app_state);

    if config.serve_static {
        router = router.fallback_service(ServeDir::new(&config.static_path));
    }

    router
}

/// Build the CORS layer. An empty origin list allows any origin.
fn create_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    }
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
