//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and shutdown.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fieldpulse_core::ConfigError,
    },

    /// Connecting to the document store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: fieldpulse_db::DbError,
    },

    /// Loading or bootstrapping the live snapshot failed.
    #[error("sync error: {source}")]
    Sync {
        /// The underlying synchronizer error.
        #[from]
        source: fieldpulse_sync::SyncError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: fieldpulse_observer::StartupError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {message}")]
    Signal {
        /// Description of the signal failure.
        message: String,
    },
}
