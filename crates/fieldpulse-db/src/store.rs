//! The document store seam.
//!
//! A [`DocumentStore`] holds whole [`Snapshot`] documents addressed by a
//! [`DocumentKey`]. Writes replace the full document; there are no partial
//! field updates. Every successful write is announced on the store's
//! change feed, which carries the full replaced document.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use fieldpulse_types::Snapshot;
use tokio::sync::broadcast;

use crate::error::DbError;

/// Capacity of the change feed broadcast channel.
///
/// A subscriber that falls behind by more than this many changes receives
/// [`broadcast::error::RecvError::Lagged`] and resumes at the newest one.
pub const CHANGE_FEED_CAPACITY: usize = 64;

/// Namespace of the live telemetry document.
pub const METRICS_NAMESPACE: &str = "metrics";

/// Identifier of the live telemetry document.
pub const LIVE_DOCUMENT: &str = "live";

/// Address of a document: a namespace plus an identifier inside it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentKey {
    namespace: String,
    id: String,
}

impl DocumentKey {
    /// Create a key for `id` inside `namespace`.
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
        }
    }

    /// The `metrics/live` document holding the current telemetry snapshot.
    pub fn live() -> Self {
        Self::new(METRICS_NAMESPACE, LIVE_DOCUMENT)
    }

    /// Return the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Return the identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Flat key used by key-value backends (`metrics:live`).
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.namespace, self.id)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.id)
    }
}

/// Notification that a document was replaced.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    /// The document that changed.
    pub key: DocumentKey,
    /// The full document as written.
    pub snapshot: Arc<Snapshot>,
}

/// A store of whole snapshot documents with a push change feed.
///
/// Implementations must make [`write`](Self::write) replace the document
/// as one unit: a concurrent [`read`](Self::read) observes either the old
/// or the new document, never a mix.
pub trait DocumentStore: Send + Sync + 'static {
    /// Read the document at `key`. `Ok(None)` means it does not exist.
    fn read(
        &self,
        key: &DocumentKey,
    ) -> impl Future<Output = Result<Option<Snapshot>, DbError>> + Send;

    /// Replace the document at `key` with `snapshot` and announce the change.
    fn write(
        &self,
        key: &DocumentKey,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Subscribe to changes of every document in this store.
    ///
    /// Only changes written after this call are delivered.
    fn changes(&self) -> broadcast::Receiver<DocumentChange>;
}
