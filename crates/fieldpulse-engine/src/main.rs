//! Engine binary for `FieldPulse`.
//!
//! Wires the document store, the synchronizer, and the observer API
//! together and runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `fieldpulse-config.yaml` (or
//!    `FIELDPULSE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the configured document store
//! 4. Load the live snapshot, bootstrapping it if absent
//! 5. Subscribe to the live document and start periodic generation
//! 6. Spawn the observer API server
//! 7. Wait for `Ctrl-C`, then stop the timer and subscription

mod error;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use fieldpulse_core::{FieldPulseConfig, StoreBackend, SystemClock, TelemetryGenerator};
use fieldpulse_db::{DocumentKey, DocumentStore, DragonflyStore, MemoryStore};
use fieldpulse_observer::{AppState, ServerConfig};
use fieldpulse_sync::{Synchronizer, SynchronizerConfig};
use tracing::info;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "fieldpulse-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any startup step fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path =
        std::env::var("FIELDPULSE_CONFIG").map_or_else(|_| PathBuf::from(CONFIG_PATH), PathBuf::from);
    let config = FieldPulseConfig::load_or_default(&config_path)?;

    // 2. Initialize structured logging.
    logging::init(&config.logging);

    info!(
        config = %config_path.display(),
        backend = ?config.store.backend,
        period_secs = config.telemetry.period_secs,
        utc_offset_minutes = config.telemetry.utc_offset_minutes,
        "fieldpulse-engine starting"
    );

    // 3. Connect the document store.
    match config.store.backend {
        StoreBackend::Memory => run(Arc::new(MemoryStore::new()), &config).await,
        StoreBackend::Dragonfly => {
            info!(url = %config.store.dragonfly_url, "Connecting to Dragonfly");
            let store = DragonflyStore::connect(&config.store.dragonfly_url).await?;
            run(Arc::new(store), &config).await
        }
    }
}

/// Run the synchronizer and observer over `store` until `Ctrl-C`.
async fn run<S: DocumentStore>(store: Arc<S>, config: &FieldPulseConfig) -> Result<(), EngineError> {
    let generator = TelemetryGenerator::new(config.telemetry.generator_config()?);
    let sync = Arc::new(Synchronizer::new(
        store,
        generator,
        Arc::new(SystemClock),
        synchronizer_config(config),
    ));

    // 4. Load or bootstrap the live snapshot.
    let snapshot = sync.load_once().await?;
    info!(
        document = %sync.key(),
        updated_at = %snapshot.updated_at,
        "Live snapshot ready"
    );

    // 5. Subscribe and start the timer.
    let state = Arc::new(AppState::new(Arc::clone(&sync)));
    let subscription = state.attach();
    sync.start_periodic();

    // 6. Start the observer API server.
    let observer = if config.observer.enabled {
        let server_config = ServerConfig {
            host: config.observer.host.clone(),
            port: config.observer.port,
        };
        Some(fieldpulse_observer::spawn_observer(
            server_config,
            Arc::clone(&state),
        )?)
    } else {
        info!("Observer API disabled");
        None
    };

    // 7. Wait for shutdown.
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| EngineError::Signal {
            message: format!("{e}"),
        })?;
    info!("Shutdown requested");

    sync.stop_periodic();
    subscription.cancel();
    if let Some(handle) = observer {
        handle.abort();
    }

    info!("fieldpulse-engine shutdown complete");
    Ok(())
}

/// Synchronizer parameters from the loaded configuration.
fn synchronizer_config(config: &FieldPulseConfig) -> SynchronizerConfig {
    SynchronizerConfig {
        key: DocumentKey::new(
            config.store.namespace.as_str(),
            config.store.document.as_str(),
        ),
        period: config.telemetry.period(),
        seed: config.telemetry.seed,
    }
}
