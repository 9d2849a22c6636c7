//! Push subscription to the live document.

use std::sync::Arc;

use fieldpulse_db::{DocumentChange, DocumentKey};
use fieldpulse_types::Snapshot;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::AbortHandle;

/// Cancellation handle for a subscription opened by
/// [`Synchronizer::subscribe`](crate::Synchronizer::subscribe).
///
/// Dropping the handle does not cancel the subscription; call
/// [`cancel`](Self::cancel). Cancelling more than once is harmless.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    abort: AbortHandle,
}

impl SubscriptionHandle {
    pub(crate) const fn new(abort: AbortHandle) -> Self {
        Self { abort }
    }

    /// Stop delivering changes.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Whether the subscription still delivers changes.
    pub fn is_active(&self) -> bool {
        !self.abort.is_finished()
    }
}

/// Drive one subscription until it is aborted or the feed closes.
///
/// `remember` runs before `on_change` for every change to `key` and drops
/// deliveries older than the snapshot already known, so the
/// synchronizer's last-known snapshot is current by the time the
/// consumer hears about it.
pub(crate) async fn deliver<R, F>(
    mut rx: broadcast::Receiver<DocumentChange>,
    key: DocumentKey,
    remember: R,
    mut on_change: F,
) where
    R: Fn(Arc<Snapshot>) + Send,
    F: FnMut(Arc<Snapshot>) + Send,
{
    loop {
        match rx.recv().await {
            Ok(change) if change.key == key => {
                tracing::debug!(
                    %key,
                    updated_at = %change.snapshot.updated_at,
                    "Live snapshot changed"
                );
                remember(Arc::clone(&change.snapshot));
                on_change(change.snapshot);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(%key, skipped, "Subscription lagged, resuming at newest change");
            }
            Err(RecvError::Closed) => {
                tracing::info!(%key, "Change feed closed, subscription ended");
                break;
            }
        }
    }
}
