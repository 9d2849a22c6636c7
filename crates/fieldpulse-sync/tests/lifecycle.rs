//! Lifecycle tests for the synchronizer over the in-memory store.
//!
//! Timer tests run on a paused tokio clock, so a five-minute period passes
//! instantly and deterministically.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fieldpulse_core::{ManualClock, TelemetryGenerator};
use fieldpulse_db::{DbError, DocumentChange, DocumentKey, DocumentStore, MemoryStore};
use fieldpulse_sync::{SyncError, Synchronizer, SynchronizerConfig};
use fieldpulse_types::Snapshot;
use tokio::sync::broadcast;

// =============================================================================
// Helpers
// =============================================================================

fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 10, 15, 0).unwrap()
}

fn synchronizer_over<S: DocumentStore>(store: &Arc<S>, seed: u64) -> Synchronizer<S> {
    Synchronizer::new(
        Arc::clone(store),
        TelemetryGenerator::default(),
        Arc::new(ManualClock::new(start_instant())),
        SynchronizerConfig {
            seed: Some(seed),
            ..SynchronizerConfig::default()
        },
    )
}

/// Yield to the scheduler until `done` holds, or give up after a while.
async fn settle(done: impl Fn() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
}

/// A memory store whose reads and writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl DocumentStore for FlakyStore {
    async fn read(&self, key: &DocumentKey) -> Result<Option<Snapshot>, DbError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("read refused".to_owned()));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &DocumentKey, snapshot: &Snapshot) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("write refused".to_owned()));
        }
        self.inner.write(key, snapshot).await
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.inner.changes()
    }
}

// =============================================================================
// load_once
// =============================================================================

#[tokio::test]
async fn load_once_bootstraps_empty_store_with_one_write() {
    let store = Arc::new(MemoryStore::new());
    let sync = synchronizer_over(&store, 1);

    let snapshot = sync.load_once().await.unwrap();

    assert_eq!(store.write_count(), 1);
    assert_eq!(snapshot.updated_at, start_instant());
    assert!(snapshot.co2_saved.total_kg.abs() < f64::EPSILON);
    assert_eq!(snapshot.temperature.history.len(), 1);
    assert_eq!(
        store.read(&DocumentKey::live()).await.unwrap().as_ref(),
        Some(snapshot.as_ref())
    );
    assert_eq!(sync.last_known(), Some(snapshot));
}

#[tokio::test]
async fn load_once_propagates_read_failure() {
    let store = Arc::new(FlakyStore::default());
    store.fail_reads.store(true, Ordering::SeqCst);
    let sync = synchronizer_over(&store, 1);

    let result = sync.load_once().await;

    assert!(matches!(result, Err(SyncError::Store { .. })));
    assert_eq!(store.inner.write_count(), 0);
    assert!(sync.last_known().is_none());
}

// =============================================================================
// trigger_once
// =============================================================================

#[tokio::test]
async fn trigger_once_surfaces_write_failure_and_keeps_last_known() {
    let store = Arc::new(FlakyStore::default());
    let sync = synchronizer_over(&store, 2);
    let loaded = sync.load_once().await.unwrap();

    store.fail_writes.store(true, Ordering::SeqCst);
    let result = sync.trigger_once().await;

    assert!(result.is_err());
    assert_eq!(sync.last_known(), Some(loaded));
    assert_eq!(store.inner.write_count(), 1);
}

#[tokio::test]
async fn trigger_once_does_not_call_subscriber_directly() {
    let store = Arc::new(MemoryStore::new());
    let sync = synchronizer_over(&store, 3);
    sync.load_once().await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let _handle = sync.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Delivery happens on the subscription task, after the write.
    sync.trigger_once().await.unwrap();
    settle(|| calls.load(Ordering::SeqCst) == 1).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fresh_instance_trigger_builds_on_persisted_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let first = synchronizer_over(&store, 12);
    first.load_once().await.unwrap();
    for _ in 0..20 {
        first.trigger_once().await.unwrap();
    }
    let persisted = first.last_known().unwrap();

    let second = synchronizer_over(&store, 13);
    let next = second.trigger_once().await.unwrap();

    assert!(next.co2_saved.total_kg >= persisted.co2_saved.total_kg);
    assert!(next.co2_saved.total_kg > 0.0);
    assert_eq!(
        next.temperature.history.len(),
        persisted.temperature.history.len() + 1
    );
    assert_eq!(store.write_count(), 22);
}

#[tokio::test(start_paused = true)]
async fn fresh_instance_timer_builds_on_persisted_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let seeded = synchronizer_over(&store, 14).load_once().await.unwrap();

    let sync = synchronizer_over(&store, 15);
    sync.start_periodic();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let next = sync.last_known().unwrap();
    assert_eq!(next.temperature.history.len(), 2);
    assert_eq!(
        next.temperature.history.first(),
        seeded.temperature.history.first()
    );
}

// =============================================================================
// subscribe
// =============================================================================

#[tokio::test]
async fn second_subscription_replaces_first() {
    let store = Arc::new(MemoryStore::new());
    let sync = synchronizer_over(&store, 4);

    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&first_calls);
    let first = sync.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(&second_calls);
    let _second = sync.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    sync.trigger_once().await.unwrap();
    sync.trigger_once().await.unwrap();
    settle(|| second_calls.load(Ordering::SeqCst) == 2).await;

    let total = first_calls.load(Ordering::SeqCst) + second_calls.load(Ordering::SeqCst);
    assert_eq!(total, 2);
    assert_eq!(second_calls.load(Ordering::SeqCst), 2);
    assert!(!first.is_active());
    assert!(sync.has_subscription());
}

#[tokio::test]
async fn subscription_sees_other_writers() {
    let store = Arc::new(MemoryStore::new());
    let watcher = synchronizer_over(&store, 5);
    let writer = synchronizer_over(&store, 6);

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let _handle = watcher.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let written = writer.load_once().await.unwrap();
    settle(|| seen.load(Ordering::SeqCst) == 1).await;

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(watcher.last_known(), Some(written));
}

#[tokio::test]
async fn cancelled_subscription_stops_delivery() {
    let store = Arc::new(MemoryStore::new());
    let sync = synchronizer_over(&store, 7);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handle = sync.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    handle.cancel();
    settle(|| !handle.is_active()).await;

    sync.trigger_once().await.unwrap();
    settle(|| false).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!sync.has_subscription());
}

// =============================================================================
// start_periodic / stop_periodic
// =============================================================================

#[tokio::test(start_paused = true)]
async fn start_periodic_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let sync = synchronizer_over(&store, 8);

    assert!(sync.start_periodic());
    assert!(!sync.start_periodic());
    assert!(sync.is_periodic_running());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.write_count(), 1, "exactly one immediate trigger");

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(store.write_count(), 2, "one timer, one tick per period");

    assert!(sync.stop_periodic());
    assert!(!sync.stop_periodic());
    tokio::time::sleep(Duration::from_secs(900)).await;
    assert_eq!(store.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn periodic_failure_keeps_timer_and_last_known() {
    let store = Arc::new(FlakyStore::default());
    let sync = synchronizer_over(&store, 9);
    let loaded = sync.load_once().await.unwrap();

    store.fail_writes.store(true, Ordering::SeqCst);
    sync.start_periodic();
    tokio::time::sleep(Duration::from_secs(601)).await;

    assert!(sync.is_periodic_running());
    assert_eq!(sync.last_known(), Some(Arc::clone(&loaded)));

    // The next tick after recovery builds on the snapshot loaded before
    // the failures.
    store.fail_writes.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(300)).await;

    let recovered = sync.last_known().unwrap();
    assert_eq!(store.inner.write_count(), 2);
    assert_eq!(recovered.temperature.history.len(), 2);
    assert_eq!(
        recovered.temperature.history.first(),
        loaded.temperature.history.first()
    );
}

#[tokio::test(start_paused = true)]
async fn drop_cancels_timer() {
    let store = Arc::new(MemoryStore::new());
    {
        let sync = synchronizer_over(&store, 10);
        sync.start_periodic();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    tokio::time::sleep(Duration::from_secs(900)).await;
    assert_eq!(store.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_triggers_immediately() {
    let store = Arc::new(MemoryStore::new());
    let sync = synchronizer_over(&store, 11);

    sync.start_periodic();
    tokio::time::sleep(Duration::from_secs(1)).await;
    sync.stop_periodic();

    assert!(sync.start_periodic());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.write_count(), 2);
}
