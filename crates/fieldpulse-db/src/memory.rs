//! Process-local document store.
//!
//! Keeps documents in a map behind an async lock and fans every write out
//! on a [`broadcast`] channel. Used by the `memory` backend and throughout
//! the test suites, where [`MemoryStore::write_count`] lets tests assert
//! exactly how many persistence writes happened.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fieldpulse_types::Snapshot;
use tokio::sync::{RwLock, broadcast};

use crate::error::DbError;
use crate::store::{CHANGE_FEED_CAPACITY, DocumentChange, DocumentKey, DocumentStore};

/// In-memory [`DocumentStore`].
#[derive(Debug)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocumentKey, Arc<Snapshot>>>,
    tx: broadcast::Sender<DocumentChange>,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            documents: RwLock::new(BTreeMap::new()),
            tx,
            writes: AtomicU64::new(0),
        }
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    /// Number of documents currently stored.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    async fn read(&self, key: &DocumentKey) -> Result<Option<Snapshot>, DbError> {
        let documents = self.documents.read().await;
        Ok(documents.get(key).map(|doc| Snapshot::clone(doc)))
    }

    async fn write(&self, key: &DocumentKey, snapshot: &Snapshot) -> Result<(), DbError> {
        let document = Arc::new(snapshot.clone());
        // Publish while holding the write lock so the feed order matches
        // the order in which documents were replaced.
        let mut documents = self.documents.write().await;
        documents.insert(key.clone(), Arc::clone(&document));
        self.writes.fetch_add(1, Ordering::AcqRel);

        let receivers = self
            .tx
            .send(DocumentChange {
                key: key.clone(),
                snapshot: document,
            })
            .unwrap_or(0);
        tracing::debug!(%key, receivers, "Document replaced");
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use fieldpulse_core::TelemetryGenerator;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn snapshot(hour: u32) -> Snapshot {
        let mut rng = SmallRng::seed_from_u64(u64::from(hour));
        TelemetryGenerator::default().next_snapshot(
            None,
            Utc.with_ymd_and_hms(2026, 2, 3, hour, 0, 0).unwrap(),
            &mut rng,
        )
    }

    #[tokio::test]
    async fn missing_document_reads_none() {
        let store = MemoryStore::new();
        assert!(store.read(&DocumentKey::live()).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn write_replaces_whole_document() {
        let store = MemoryStore::new();
        let key = DocumentKey::live();
        let first = snapshot(1);
        let second = snapshot(2);

        store.write(&key, &first).await.unwrap();
        store.write(&key, &second).await.unwrap();

        assert_eq!(store.read(&key).await.unwrap(), Some(second));
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn changes_carry_full_document() {
        let store = MemoryStore::new();
        let key = DocumentKey::live();
        let mut rx = store.changes();

        let written = snapshot(3);
        store.write(&key, &written).await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, key);
        assert_eq!(*change.snapshot, written);
    }

    #[tokio::test]
    async fn changes_before_subscribe_are_not_replayed() {
        let store = MemoryStore::new();
        let key = DocumentKey::live();
        store.write(&key, &snapshot(4)).await.unwrap();

        let mut rx = store.changes();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn documents_are_isolated_by_key() {
        let store = MemoryStore::new();
        let other = DocumentKey::new("metrics", "staging");
        store.write(&other, &snapshot(5)).await.unwrap();
        assert!(store.read(&DocumentKey::live()).await.unwrap().is_none());
    }
}
