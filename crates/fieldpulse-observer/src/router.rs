//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fieldpulse_db::DocumentStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{control, handlers, ws};

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /api/telemetry` -- current snapshot
/// - `GET /api/telemetry/export` -- snapshot file download
/// - `GET /api/telemetry/status` -- timer and subscription status
/// - `POST /api/telemetry/refresh` -- generate one snapshot now
/// - `POST /api/telemetry/periodic/start` -- start the periodic timer
/// - `POST /api/telemetry/periodic/stop` -- stop the periodic timer
/// - `GET /ws/telemetry` -- `WebSocket` snapshot stream
pub fn build_router<S: DocumentStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/telemetry", get(ws::ws_telemetry::<S>))
        // Read
        .route("/api/telemetry", get(handlers::get_telemetry::<S>))
        .route("/api/telemetry/export", get(handlers::export_telemetry::<S>))
        .route("/api/telemetry/status", get(control::status::<S>))
        // Control
        .route("/api/telemetry/refresh", post(control::refresh::<S>))
        .route(
            "/api/telemetry/periodic/start",
            post(control::start_periodic::<S>),
        )
        .route(
            "/api/telemetry/periodic/stop",
            post(control::stop_periodic::<S>),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
