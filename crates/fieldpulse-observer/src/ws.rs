//! `WebSocket` handler for real-time snapshot streaming.
//!
//! Clients connect to `GET /ws/telemetry`. They first receive the last
//! known snapshot, if any, and then a JSON-encoded [`Snapshot`] each time
//! one is persisted to the live document.
//!
//! If a client falls behind, lagged messages are skipped and the client
//! resumes from the most recent snapshot.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use fieldpulse_db::DocumentStore;
use fieldpulse_types::Snapshot;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots.
///
/// # Route
///
/// `GET /ws/telemetry`
pub async fn ws_telemetry<S: DocumentStore>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Send one snapshot as a text frame. Returns `false` once the client
/// is gone.
async fn send_snapshot(socket: &mut WebSocket, snapshot: &Snapshot) -> bool {
    let json = match serde_json::to_string(snapshot) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize snapshot: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Handle the `WebSocket` lifecycle: subscribe to the broadcast
/// channel and forward each snapshot as a text frame.
async fn handle_ws<S: DocumentStore>(mut socket: WebSocket, state: Arc<AppState<S>>) {
    debug!("WebSocket client connected");

    // Subscribe before sending the current snapshot so nothing written in
    // between is lost.
    let mut rx = state.subscribe();

    let greeted = match state.sync.last_known() {
        Some(current) => send_snapshot(&mut socket, &current).await,
        None => true,
    };
    if !greeted {
        debug!("WebSocket client disconnected (send failed)");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        if !send_snapshot(&mut socket, &snapshot).await {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
