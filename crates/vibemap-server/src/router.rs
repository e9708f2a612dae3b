//! Axum router construction for the heatmap server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin map clients.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the heatmap server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/view` -- `WebSocket` live map view
/// - `GET /api/heatmap` -- filtered places for a location
/// - `GET /api/places/{id}/emotions` -- emotion profile of one place
/// - `GET /api/map/config` -- map bootstrap settings
///
/// CORS allows any origin so the map page can be served from elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/view", get(ws::ws_view))
        // REST API
        .route("/api/heatmap", get(handlers::heatmap))
        .route("/api/places/{id}/emotions", get(handlers::place_emotions))
        .route("/api/map/config", get(handlers::map_config))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
