//! Axum router construction for the Observer API.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the Observer router.
///
/// Routes: `/`, `/api/snapshot`, `/api/agents`, `/api/rooms`,
/// `/api/events` and the `/ws/phases` stream. CORS allows any origin so
/// a local dashboard can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws/phases", get(ws::ws_phases))
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/rooms", get(handlers::list_rooms))
        .route("/api/events", get(handlers::list_events))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
