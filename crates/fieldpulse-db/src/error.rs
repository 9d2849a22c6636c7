//! Error types for the document store layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`fred`] and [`serde_json`] errors with context about which operation
//! failed.

/// Errors that can occur in the document store layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused or could not complete the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
