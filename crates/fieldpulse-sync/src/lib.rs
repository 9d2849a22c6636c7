//! Synchronization of the live `FieldPulse` snapshot.
//!
//! The [`Synchronizer`] sits between the pure generator and a
//! [`DocumentStore`]: it bootstraps or loads the live document, pushes every
//! persisted change to one subscriber, and runs at most one periodic timer
//! that generates and persists the next snapshot.
//!
//! ```text
//! start_periodic ──► tick ──► Generator ──► DocumentStore::write
//!                                                  │
//!                        on_change ◄── subscribe ◄─┘ (change feed)
//! ```
//!
//! # Modules
//!
//! - [`synchronizer`] -- [`Synchronizer`] and its construction parameters
//! - [`subscription`] -- [`SubscriptionHandle`] and change delivery
//! - [`error`] -- [`SyncError`]
//!
//! [`DocumentStore`]: fieldpulse_db::DocumentStore

pub mod error;
pub mod subscription;
pub mod synchronizer;

pub use error::SyncError;
pub use subscription::SubscriptionHandle;
pub use synchronizer::{DEFAULT_PERIOD, Synchronizer, SynchronizerConfig};
