//! The [`Synchronizer`] lifecycle.
//!
//! One synchronizer owns one live document. It remembers the last snapshot
//! it has seen (loaded, written, or delivered by the change feed), derives
//! the next one from it through the [`TelemetryGenerator`], and persists
//! each result as a single whole-document write.
//!
//! Two background tasks may run per instance, each at most once:
//!
//! - the **subscription**, which forwards store changes to a consumer
//!   callback ([`Synchronizer::subscribe`]);
//! - the **periodic timer**, which triggers a generation immediately and
//!   then once per period ([`Synchronizer::start_periodic`]).
//!
//! Dropping the synchronizer cancels both.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use fieldpulse_core::{Clock, TelemetryGenerator};
use fieldpulse_db::{DocumentKey, DocumentStore};
use fieldpulse_types::Snapshot;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use crate::error::SyncError;
use crate::subscription::{self, SubscriptionHandle};

/// Default time between periodic generations.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(300);

/// Shortest period the timer accepts.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Construction parameters for a [`Synchronizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronizerConfig {
    /// The document this synchronizer owns.
    pub key: DocumentKey,
    /// Time between periodic generations.
    pub period: Duration,
    /// Seed for the generator's random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            key: DocumentKey::live(),
            period: DEFAULT_PERIOD,
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared between the synchronizer and its background tasks.
struct Shared<S> {
    store: Arc<S>,
    key: DocumentKey,
    generator: TelemetryGenerator,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    last_known: Mutex<Option<Arc<Snapshot>>>,
}

impl<S: DocumentStore> Shared<S> {
    fn last_known(&self) -> Option<Arc<Snapshot>> {
        self.last_known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record `snapshot` unless a newer one is already known.
    fn remember(&self, snapshot: Arc<Snapshot>) {
        let mut slot = self
            .last_known
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(current) if current.updated_at > snapshot.updated_at => {
                tracing::debug!(
                    key = %self.key,
                    known = %current.updated_at,
                    stale = %snapshot.updated_at,
                    "Ignoring out-of-order snapshot"
                );
            }
            _ => *slot = Some(snapshot),
        }
    }

    /// Generate from `previous` at the clock's current instant and persist.
    async fn generate_and_write(
        &self,
        previous: Option<&Snapshot>,
    ) -> Result<Arc<Snapshot>, SyncError> {
        let now = self.clock.now();
        let snapshot = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            self.generator.next_snapshot(previous, now, &mut *rng)
        };

        self.store.write(&self.key, &snapshot).await?;

        let snapshot = Arc::new(snapshot);
        self.remember(Arc::clone(&snapshot));
        tracing::debug!(
            key = %self.key,
            updated_at = %snapshot.updated_at,
            temperature = snapshot.temperature.current,
            total_co2_kg = snapshot.co2_saved.total_kg,
            "Snapshot persisted"
        );
        Ok(snapshot)
    }

    /// Build on the last known snapshot, falling back to the persisted one
    /// so a fresh instance never overwrites existing counters.
    async fn trigger_once(&self) -> Result<Arc<Snapshot>, SyncError> {
        let previous = match self.last_known() {
            Some(snapshot) => Some(snapshot),
            None => self.store.read(&self.key).await?.map(Arc::new),
        };
        self.generate_and_write(previous.as_deref()).await
    }
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Keeps the live document in step with the generator and pushes every
/// persisted change to one consumer.
pub struct Synchronizer<S: DocumentStore> {
    shared: Arc<Shared<S>>,
    period: Duration,
    subscription: Mutex<Option<SubscriptionHandle>>,
    periodic: Mutex<Option<AbortHandle>>,
}

impl<S: DocumentStore> Synchronizer<S> {
    /// Create a synchronizer over `store`. Nothing is read or started yet.
    pub fn new(
        store: Arc<S>,
        generator: TelemetryGenerator,
        clock: Arc<dyn Clock>,
        config: SynchronizerConfig,
    ) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            shared: Arc::new(Shared {
                store,
                key: config.key,
                generator,
                clock,
                rng: Mutex::new(rng),
                last_known: Mutex::new(None),
            }),
            period: config.period.max(MIN_PERIOD),
            subscription: Mutex::new(None),
            periodic: Mutex::new(None),
        }
    }

    /// The document this synchronizer owns.
    pub fn key(&self) -> &DocumentKey {
        &self.shared.key
    }

    /// The store this synchronizer writes to.
    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    /// Time between periodic generations.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// The most recent snapshot this instance has loaded, written, or
    /// received. `None` before the first successful load or write.
    pub fn last_known(&self) -> Option<Arc<Snapshot>> {
        self.shared.last_known()
    }

    /// Read the persisted snapshot, bootstrapping it if absent.
    ///
    /// When the document does not exist yet, a snapshot is generated with
    /// no predecessor and written once. Read failures are returned rather
    /// than papered over with a generated snapshot.
    pub async fn load_once(&self) -> Result<Arc<Snapshot>, SyncError> {
        if let Some(snapshot) = self.shared.store.read(&self.shared.key).await? {
            let snapshot = Arc::new(snapshot);
            self.shared.remember(Arc::clone(&snapshot));
            tracing::info!(
                key = %self.shared.key,
                updated_at = %snapshot.updated_at,
                "Loaded persisted snapshot"
            );
            return Ok(snapshot);
        }

        tracing::info!(key = %self.shared.key, "No persisted snapshot, bootstrapping");
        self.shared.generate_and_write(None).await
    }

    /// Deliver every snapshot persisted to the live document, by this or
    /// any other writer, to `on_change`.
    ///
    /// Only changes written after this call are delivered. A previous
    /// subscription on this instance is cancelled first.
    pub fn subscribe<F>(&self, on_change: F) -> SubscriptionHandle
    where
        F: FnMut(Arc<Snapshot>) + Send + 'static,
    {
        let mut slot = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.cancel();
            tracing::debug!(key = %self.shared.key, "Replaced existing subscription");
        }

        // Take the receiver before spawning so no change written after
        // this call returns can be missed.
        let rx = self.shared.store.changes();
        let shared = Arc::clone(&self.shared);
        let key = shared.key.clone();
        let task = tokio::spawn(subscription::deliver(
            rx,
            key,
            move |snapshot| shared.remember(snapshot),
            on_change,
        ));

        let handle = SubscriptionHandle::new(task.abort_handle());
        *slot = Some(handle.clone());
        tracing::info!(key = %self.shared.key, "Subscribed to live snapshot");
        handle
    }

    /// Whether a subscription opened on this instance is still active.
    pub fn has_subscription(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(SubscriptionHandle::is_active)
    }

    /// Generate the next snapshot from the last known one and persist it.
    ///
    /// Before anything is known locally the persisted snapshot is read and
    /// used as the predecessor. Only a missing document starts from scratch.
    ///
    /// Consumers learn about the result through the subscription, not
    /// from this call. On failure the last known snapshot is unchanged.
    pub async fn trigger_once(&self) -> Result<Arc<Snapshot>, SyncError> {
        self.shared.trigger_once().await
    }

    /// Start the periodic timer: trigger now, then once per period.
    ///
    /// Returns `false` without doing anything if the timer is already
    /// running. Tick failures are logged and the timer keeps going.
    pub fn start_periodic(&self) -> bool {
        let mut slot = self.periodic.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!(key = %self.shared.key, "Periodic generation already running");
            return false;
        }

        let shared = Arc::clone(&self.shared);
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // The first tick completes immediately.
                interval.tick().await;
                if let Err(e) = shared.trigger_once().await {
                    tracing::warn!(
                        key = %shared.key,
                        error = %e,
                        "Periodic generation failed, keeping last known snapshot"
                    );
                }
            }
        });

        *slot = Some(task.abort_handle());
        tracing::info!(
            key = %self.shared.key,
            period_secs = period.as_secs_f64(),
            "Periodic generation started"
        );
        true
    }

    /// Stop the periodic timer. Returns whether it was running.
    pub fn stop_periodic(&self) -> bool {
        let task = self
            .periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match task {
            Some(task) if !task.is_finished() => {
                task.abort();
                tracing::info!(key = %self.shared.key, "Periodic generation stopped");
                true
            }
            _ => false,
        }
    }

    /// Whether the periodic timer is running.
    pub fn is_periodic_running(&self) -> bool {
        self.periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl<S: DocumentStore> Drop for Synchronizer<S> {
    fn drop(&mut self) {
        let periodic = self.periodic.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = periodic.take() {
            task.abort();
        }
        let subscription = self
            .subscription
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = subscription.take() {
            handle.cancel();
        }
    }
}

impl<S: DocumentStore> std::fmt::Debug for Synchronizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("key", &self.shared.key)
            .field("period", &self.period)
            .field("periodic_running", &self.is_periodic_running())
            .field("subscribed", &self.has_subscription())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use fieldpulse_core::ManualClock;
    use fieldpulse_db::MemoryStore;

    use super::*;

    fn synchronizer(store: &Arc<MemoryStore>) -> Synchronizer<MemoryStore> {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap(),
        ));
        Synchronizer::new(
            Arc::clone(store),
            TelemetryGenerator::default(),
            clock,
            SynchronizerConfig {
                seed: Some(7),
                ..SynchronizerConfig::default()
            },
        )
    }

    #[test]
    fn default_config_targets_live_document() {
        let config = SynchronizerConfig::default();
        assert_eq!(config.key, DocumentKey::live());
        assert_eq!(config.period, Duration::from_secs(300));
        assert!(config.seed.is_none());
    }

    #[tokio::test]
    async fn trigger_builds_on_last_known() {
        let store = Arc::new(MemoryStore::new());
        let sync = synchronizer(&store);

        let first = sync.load_once().await.unwrap();
        let second = sync.trigger_once().await.unwrap();

        assert_eq!(first.temperature.history.len(), 1);
        assert_eq!(second.temperature.history.len(), 2);
        assert_eq!(sync.last_known(), Some(second));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn load_reads_existing_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let seeded = synchronizer(&store).load_once().await.unwrap();

        let sync = synchronizer(&store);
        let loaded = sync.load_once().await.unwrap();

        assert_eq!(loaded, seeded);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn older_delivery_does_not_replace_newer_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap(),
        ));
        let sync = Synchronizer::new(
            Arc::clone(&store),
            TelemetryGenerator::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            SynchronizerConfig {
                seed: Some(7),
                ..SynchronizerConfig::default()
            },
        );

        let older = sync.load_once().await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2026, 6, 1, 9, 35, 0).unwrap());
        let newer = sync.trigger_once().await.unwrap();

        sync.shared.remember(Arc::clone(&older));
        assert_eq!(sync.last_known(), Some(newer));
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let sync = synchronizer(&store);
        assert!(!sync.stop_periodic());
        assert!(!sync.stop_periodic());
        assert!(!sync.is_periodic_running());
    }

    #[tokio::test]
    async fn subscription_cancel_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let sync = synchronizer(&store);
        let handle = sync.subscribe(|_| {});
        assert!(sync.has_subscription());

        handle.cancel();
        handle.cancel();
        for _ in 0..10 {
            if !handle.is_active() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!handle.is_active());
        assert!(!sync.has_subscription());
    }
}
