//! Observer API server for the live `FieldPulse` snapshot.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/telemetry`) streaming every persisted
//!   snapshot via [`tokio::sync::broadcast`]
//! - **REST endpoints** for reading and exporting the current snapshot
//! - **Control endpoints** for manual refresh and starting or stopping
//!   periodic generation
//!
//! # Architecture
//!
//! The observer is a consumer of the [`Synchronizer`]: reads are served
//! from its last known snapshot, controls call straight into it, and the
//! stream is fed by its subscription. The observer never writes the
//! document itself.
//!
//! [`Synchronizer`]: fieldpulse_sync::Synchronizer

pub mod control;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_observer};
pub use state::AppState;
