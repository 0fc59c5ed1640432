//! Axum router construction for the province API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use realm_core::ProvinceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET /api/catalog` -- the active catalog
/// - `POST /api/provinces` -- onboard a province
/// - `GET /api/provinces/{id}` -- province snapshot (after lazy accrual)
/// - `POST /api/provinces/{id}/actions` -- execute an action
/// - `POST /api/provinces/{id}/reset` -- reset a province
/// - `GET /ws/provinces/{id}` -- `WebSocket` change stream
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router<S: ProvinceStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/provinces/{id}", get(ws::ws_province::<S>))
        // REST API
        .route("/api/catalog", get(handlers::get_catalog::<S>))
        .route("/api/provinces", post(handlers::create_province::<S>))
        .route("/api/provinces/{id}", get(handlers::get_province::<S>))
        .route(
            "/api/provinces/{id}/actions",
            post(handlers::execute_action::<S>),
        )
        .route(
            "/api/provinces/{id}/reset",
            post(handlers::reset_province::<S>),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
