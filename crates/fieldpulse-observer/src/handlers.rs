//! REST handlers for reading and exporting the live snapshot.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/telemetry` | Current snapshot as JSON |
//! | `GET` | `/api/telemetry/export` | Current snapshot as a JSON file download |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use fieldpulse_db::DocumentStore;
use fieldpulse_types::Snapshot;

use crate::error::ObserverError;
use crate::state::AppState;

/// The snapshot the synchronizer last saw, loading it on first use.
async fn current<S: DocumentStore>(state: &AppState<S>) -> Result<Arc<Snapshot>, ObserverError> {
    if let Some(snapshot) = state.sync.last_known() {
        return Ok(snapshot);
    }
    Ok(state.sync.load_once().await?)
}

// ---------------------------------------------------------------------------
// GET /api/telemetry
// ---------------------------------------------------------------------------

/// Return the current snapshot.
///
/// If nothing has been loaded yet the persisted document is read (and
/// bootstrapped when absent).
pub async fn get_telemetry<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Snapshot>, ObserverError> {
    let snapshot = current(&state).await?;
    Ok(Json(Snapshot::clone(&snapshot)))
}

// ---------------------------------------------------------------------------
// GET /api/telemetry/export
// ---------------------------------------------------------------------------

/// Download the current snapshot as `telemetry-<updatedAt>.json`.
pub async fn export_telemetry<S: DocumentStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = current(&state).await?;
    let body = snapshot.to_export_json()?;
    let disposition = format!("attachment; filename=\"{}\"", snapshot.export_file_name());

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
