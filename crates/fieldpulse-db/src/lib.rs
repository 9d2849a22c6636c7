//! Document store layer for `FieldPulse` snapshots.
//!
//! The live telemetry snapshot is one document, `metrics/live`, replaced as
//! a whole on every write. Stores push every replacement to subscribers on
//! a broadcast change feed, which is what the synchronizer listens to.
//!
//! # Backends
//!
//! ```text
//! Synchronizer
//!     |
//!     +-- DocumentStore (trait)
//!         |-- MemoryStore     (process-local map + broadcast)
//!         +-- DragonflyStore  (SET + PUBLISH, PSUBSCRIBE listener)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The [`DocumentStore`] trait, keys, and change events
//! - [`memory`] -- In-memory backend used for local runs and tests
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) backend
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyStore;
pub use error::DbError;
pub use memory::MemoryStore;
pub use store::{DocumentChange, DocumentKey, DocumentStore};
