//! Observer server startup helper for embedding in the engine.
//!
//! Provides [`spawn_observer`] which launches the Observer HTTP + `WebSocket`
//! server on a background Tokio task, so the API runs alongside the
//! synchronizer's timer.

use std::sync::Arc;

use fieldpulse_db::DocumentStore;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// The address is validated before the task is spawned; the bind itself
/// happens inside the task and is logged if it fails. The caller should
/// hold the returned handle and abort it during shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address is invalid.
pub fn spawn_observer<S: DocumentStore>(
    config: ServerConfig,
    state: Arc<AppState<S>>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
