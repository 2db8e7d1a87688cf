use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors that can occur when interacting with the event log.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A concurrent append claimed the version this append computed.
    /// Retriable: the caller should re-run the read-compute-insert cycle,
    /// with backoff.
    #[error(
        "Version conflict for aggregate {aggregate_id} ({aggregate_type}): version {version} already claimed"
    )]
    Conflict {
        aggregate_id: AggregateId,
        aggregate_type: String,
        version: Version,
    },

    /// The storage layer is unreachable or failed. Retriable with backoff,
    /// eventually fatal to the calling operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// True for errors the caller may retry (with backoff).
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Unavailable(_))
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
