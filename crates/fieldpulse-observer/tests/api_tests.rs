//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The synchronizer runs over the in-memory store
//! with a manual clock, so generated instants are fixed.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use fieldpulse_core::{ManualClock, TelemetryGenerator};
use fieldpulse_db::{DbError, DocumentChange, DocumentKey, DocumentStore, MemoryStore};
use fieldpulse_observer::router::build_router;
use fieldpulse_observer::state::AppState;
use fieldpulse_sync::{Synchronizer, SynchronizerConfig};
use fieldpulse_types::Snapshot;
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;

fn make_state<S: DocumentStore>(store: &Arc<S>) -> Arc<AppState<S>> {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 14, 10, 15, 0).unwrap(),
    ));
    let sync = Synchronizer::new(
        Arc::clone(store),
        TelemetryGenerator::default(),
        clock,
        SynchronizerConfig {
            seed: Some(21),
            ..SynchronizerConfig::default()
        },
    );
    Arc::new(AppState::new(Arc::new(sync)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send<S: DocumentStore>(
    state: &Arc<AppState<S>>,
    request: Request<Body>,
) -> axum::response::Response {
    build_router(Arc::clone(state)).oneshot(request).await.unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn post(path: &str) -> Request<Body> {
    Request::post(path).body(Body::empty()).unwrap()
}

/// Store that refuses every write.
#[derive(Default)]
struct ReadOnlyStore {
    inner: MemoryStore,
}

impl DocumentStore for ReadOnlyStore {
    async fn read(&self, key: &DocumentKey) -> Result<Option<Snapshot>, DbError> {
        self.inner.read(key).await
    }

    async fn write(&self, _key: &DocumentKey, _snapshot: &Snapshot) -> Result<(), DbError> {
        Err(DbError::Unavailable("read-only".to_owned()))
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.inner.changes()
    }
}

// =========================================================================
// Read
// =========================================================================

#[tokio::test]
async fn test_get_telemetry_bootstraps_empty_store() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);

    let response = send(&state, get("/api/telemetry")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["temperature"]["history"].as_array().unwrap().len(), 1);
    assert!(json["soilPH"]["current"].is_number());
    assert!(json["co2Saved"]["totalKg"].is_number());
    assert_eq!(json["updatedAt"], "2026-03-14T10:15:00Z");
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_get_telemetry_serves_last_known_without_writing() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);
    state.sync.load_once().await.unwrap();

    let response = send(&state, get("/api/telemetry")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_export_is_a_download() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);

    let response = send(&state, get("/api/telemetry/export")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert_eq!(
        disposition,
        "attachment; filename=\"telemetry-20260314T101500Z.json\""
    );
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["nextUpdate"], "2026-03-14T10:20:00Z");
}

// =========================================================================
// Control
// =========================================================================

#[tokio::test]
async fn test_refresh_advances_snapshot() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);
    state.sync.load_once().await.unwrap();

    let response = send(&state, post("/api/telemetry/refresh")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["temperature"]["history"].as_array().unwrap().len(), 2);
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn test_refresh_failure_is_service_unavailable() {
    let store = Arc::new(ReadOnlyStore::default());
    let state = make_state(&store);

    let response = send(&state, post("/api/telemetry/refresh")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 503);
    assert!(json["error"].as_str().unwrap().contains("read-only"));
    assert!(state.sync.last_known().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_periodic_start_and_stop_are_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);

    let first = body_to_json(
        send(&state, post("/api/telemetry/periodic/start"))
            .await
            .into_body(),
    )
    .await;
    let second = body_to_json(
        send(&state, post("/api/telemetry/periodic/start"))
            .await
            .into_body(),
    )
    .await;
    assert_eq!(first["ok"], true);
    assert_eq!(second["ok"], false);
    assert_eq!(second["periodic_running"], true);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.write_count(), 1);

    let stopped = body_to_json(
        send(&state, post("/api/telemetry/periodic/stop"))
            .await
            .into_body(),
    )
    .await;
    let again = body_to_json(
        send(&state, post("/api/telemetry/periodic/stop"))
            .await
            .into_body(),
    )
    .await;
    assert_eq!(stopped["ok"], true);
    assert_eq!(again["ok"], false);
    assert_eq!(again["periodic_running"], false);
}

#[tokio::test]
async fn test_status_reports_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);

    let before = body_to_json(send(&state, get("/api/telemetry/status")).await.into_body()).await;
    assert_eq!(before["document"], "metrics/live");
    assert_eq!(before["period_secs"], 300);
    assert_eq!(before["subscribed"], false);
    assert!(before["updated_at"].is_null());

    state.sync.load_once().await.unwrap();
    let _handle = state.attach();

    let after = body_to_json(send(&state, get("/api/telemetry/status")).await.into_body()).await;
    assert_eq!(after["subscribed"], true);
    assert_eq!(after["updated_at"], "2026-03-14T10:15:00Z");
    assert_eq!(after["next_update"], "2026-03-14T10:20:00Z");
}

// =========================================================================
// Stream
// =========================================================================

#[tokio::test]
async fn test_attach_forwards_persisted_snapshots() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);
    let _handle = state.attach();
    let mut rx = state.subscribe();

    let written = state.sync.load_once().await.unwrap();

    let streamed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(streamed, written);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let state = make_state(&store);

    let response = send(&state, get("/api/nothing-here")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
