//! Shared application state for the Observer API server.
//!
//! [`AppState`] wraps the [`Synchronizer`] that owns the live document and
//! a broadcast channel that fans every persisted snapshot out to the
//! connected `WebSocket` clients. The synchronizer's single subscription
//! feeds that channel once [`AppState::attach`] has been called.

use std::sync::Arc;

use fieldpulse_db::DocumentStore;
use fieldpulse_sync::{SubscriptionHandle, Synchronizer};
use fieldpulse_types::Snapshot;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel for snapshots.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 64;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState<S: DocumentStore> {
    /// The synchronizer for the live document.
    pub sync: Arc<Synchronizer<S>>,
    /// Broadcast sender for persisted snapshots.
    tx: broadcast::Sender<Arc<Snapshot>>,
}

impl<S: DocumentStore> AppState<S> {
    /// Create the state around `sync`. No subscription is opened yet.
    pub fn new(sync: Arc<Synchronizer<S>>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sync, tx }
    }

    /// Subscribe the synchronizer to the live document and forward every
    /// persisted snapshot to the `WebSocket` broadcast.
    ///
    /// Replaces any subscription previously opened on the synchronizer.
    pub fn attach(&self) -> SubscriptionHandle {
        let tx = self.tx.clone();
        self.sync.subscribe(move |snapshot| {
            // Err only means no stream client is connected.
            let _ = tx.send(snapshot);
        })
    }

    /// Subscribe to the snapshot broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Number of connected stream receivers.
    pub fn stream_clients(&self) -> usize {
        self.tx.receiver_count()
    }
}
