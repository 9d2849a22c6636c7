//! Control endpoints for generation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/telemetry/refresh` | Generate and persist one snapshot now |
//! | `POST` | `/api/telemetry/periodic/start` | Start the periodic timer |
//! | `POST` | `/api/telemetry/periodic/stop` | Stop the periodic timer |
//! | `GET` | `/api/telemetry/status` | Timer, subscription, and freshness status |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use fieldpulse_db::DocumentStore;
use fieldpulse_types::Snapshot;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Generic control response.
#[derive(Debug, serde::Serialize)]
pub struct ControlResponse {
    /// Whether the request changed anything.
    pub ok: bool,
    /// Human-readable message.
    pub message: String,
    /// Timer state after the request.
    pub periodic_running: bool,
}

/// Response body for `GET /api/telemetry/status`.
#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    /// Address of the live document (`metrics/live`).
    pub document: String,
    /// Whether the periodic timer is running.
    pub periodic_running: bool,
    /// Whether the synchronizer has an active subscription.
    pub subscribed: bool,
    /// Seconds between periodic generations.
    pub period_secs: u64,
    /// Generation instant of the last known snapshot.
    pub updated_at: Option<DateTime<Utc>>,
    /// Advisory next update of the last known snapshot.
    pub next_update: Option<DateTime<Utc>>,
    /// Connected `WebSocket` clients.
    pub stream_clients: usize,
}

// ---------------------------------------------------------------------------
// POST /api/telemetry/refresh
// ---------------------------------------------------------------------------

/// Generate the next snapshot now and return it.
///
/// Stream clients receive it through the subscription like any other
/// write.
pub async fn refresh<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Snapshot>, ObserverError> {
    let snapshot = state.sync.trigger_once().await?;
    tracing::info!(updated_at = %snapshot.updated_at, "Manual refresh");
    Ok(Json(Snapshot::clone(&snapshot)))
}

// ---------------------------------------------------------------------------
// POST /api/telemetry/periodic/start
// ---------------------------------------------------------------------------

/// Start periodic generation. Starting twice is harmless.
pub async fn start_periodic<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<ControlResponse> {
    let started = state.sync.start_periodic();
    let message = if started {
        "Periodic generation started"
    } else {
        "Periodic generation already running"
    };
    Json(ControlResponse {
        ok: started,
        message: message.to_owned(),
        periodic_running: state.sync.is_periodic_running(),
    })
}

// ---------------------------------------------------------------------------
// POST /api/telemetry/periodic/stop
// ---------------------------------------------------------------------------

/// Stop periodic generation. Stopping twice is harmless.
pub async fn stop_periodic<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<ControlResponse> {
    let stopped = state.sync.stop_periodic();
    let message = if stopped {
        "Periodic generation stopped"
    } else {
        "Periodic generation was not running"
    };
    Json(ControlResponse {
        ok: stopped,
        message: message.to_owned(),
        periodic_running: state.sync.is_periodic_running(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/telemetry/status
// ---------------------------------------------------------------------------

/// Report timer and subscription state plus snapshot freshness.
pub async fn status<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<StatusResponse> {
    let last = state.sync.last_known();
    Json(StatusResponse {
        document: state.sync.key().to_string(),
        periodic_running: state.sync.is_periodic_running(),
        subscribed: state.sync.has_subscription(),
        period_secs: state.sync.period().as_secs(),
        updated_at: last.as_ref().map(|s| s.updated_at),
        next_update: last.as_ref().map(|s| s.next_update),
        stream_clients: state.stream_clients(),
    })
}
