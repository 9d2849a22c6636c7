//! Error types for the synchronizer.

use fieldpulse_db::DbError;

/// Errors surfaced by explicit synchronizer calls.
///
/// Periodic ticks never return these; they log and keep running.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Reading or writing the live document failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: DbError,
    },
}
