//! Projection error types.

use thiserror::Error;

/// Error raised by a fold function.
///
/// Folds are pure, so the only failures are interpretation failures:
/// a payload that does not deserialize, or state that violates the
/// fold's assumptions.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FoldError(String);

impl FoldError {
    /// Creates a fold error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for FoldError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    Store(#[from] event_store::EventStoreError),

    /// A fold function failed. Does not affect event durability or the
    /// other projections; recorded against the failing projection only.
    #[error("Projection '{projection}' fold failed: {message}")]
    Fold { projection: String, message: String },

    /// No projection with this name is registered.
    #[error("Unknown projection: {0}")]
    UnknownProjection(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
