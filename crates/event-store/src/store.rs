use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{
    AggregateId, EventFilter, EventPage, EventRecord, EventStoreError, NewEvent,
    ProjectionSnapshot, Result, Sequence, Snapshot, StoreStats, Version,
};

/// A stream of events in ascending sequence order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventRecord>> + Send>>;

/// Core trait for event log implementations.
///
/// The log is append-only: records are never mutated or deleted. All
/// implementations must be thread-safe (Send + Sync) and may be shared
/// by multiple processes over the same durable storage.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one event to the log.
    ///
    /// Reads the current maximum version for `(aggregate_id,
    /// aggregate_type)`, computes `max + 1` (1 if none exist), and inserts
    /// under the uniqueness constraint on `(aggregate_id, aggregate_type,
    /// version)`. If a concurrent writer claimed that version first, the
    /// insert fails with [`EventStoreError::Conflict`] and the caller must
    /// retry the whole cycle. The global `sequence` is assigned by the
    /// storage layer and never used to compute the version.
    ///
    /// Returns the stored record with its assigned id, version, sequence,
    /// and timestamp.
    async fn append(&self, event: NewEvent) -> Result<EventRecord>;

    /// Reads one aggregate's events, ascending by version, starting at
    /// `from_version` (inclusive). Empty if the aggregate has no events at
    /// or above that version.
    async fn read_aggregate(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: &str,
        from_version: Version,
    ) -> Result<Vec<EventRecord>>;

    /// Reads across all aggregates, descending by sequence (most recent
    /// first), with optional event-type filtering and offset pagination.
    /// The returned page carries the total count over the filtered set.
    async fn read_all(&self, filter: &EventFilter) -> Result<EventPage>;

    /// Streams events with `sequence >= from_sequence`, ascending by
    /// sequence, restricted to the given event types. An empty type slice
    /// matches every event. Used by projection replay.
    async fn read_since(&self, from_sequence: Sequence, event_types: &[String])
    -> Result<EventStream>;

    /// Read-only aggregate counts, recomputed on each call. Consistent as
    /// of the moment of the query; no isolation against concurrent appends.
    async fn stats(&self) -> Result<StoreStats>;

    /// Saves an aggregate snapshot, replacing any existing one.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Retrieves the snapshot for an aggregate, if any.
    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>>;

    /// Inserts or updates one projection row, keyed by
    /// `(projection_name, aggregate_id)`.
    async fn upsert_projection(&self, snapshot: ProjectionSnapshot) -> Result<()>;

    /// Retrieves one projection row, if it exists.
    async fn get_projection(
        &self,
        projection_name: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<ProjectionSnapshot>>;

    /// Lists every row of a projection, ordered by aggregate id.
    async fn list_projections(&self, projection_name: &str) -> Result<Vec<ProjectionSnapshot>>;

    /// Deletes every row of a projection, returning the number removed.
    ///
    /// Callers wanting a clean rebuild clear first, then replay from
    /// sequence 1; the projection engine never clears on its own.
    async fn clear_projection(&self, projection_name: &str) -> Result<u64>;
}

/// Bounded retry-with-backoff parameters for [`EventStoreExt::append_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (default 5).
    pub max_attempts: u32,

    /// Delay before the first retry; doubles per attempt (default 10ms).
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
        }
    }
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends with bounded retry on version conflicts.
    ///
    /// Only [`EventStoreError::Conflict`] is retried; every other error is
    /// returned immediately. After `max_attempts` the final conflict is
    /// surfaced to the caller.
    async fn append_with_retry(&self, event: NewEvent, policy: &RetryPolicy) -> Result<EventRecord> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.append(event.clone()).await {
                Err(EventStoreError::Conflict {
                    aggregate_id,
                    aggregate_type,
                    version,
                }) if attempt < policy.max_attempts => {
                    metrics::counter!("append_conflicts_total").increment(1);
                    tracing::debug!(
                        %aggregate_id,
                        %aggregate_type,
                        %version,
                        attempt,
                        "append conflict, retrying"
                    );
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
                other => return other,
            }
        }
    }

    /// Checks whether an aggregate has any events.
    async fn aggregate_exists(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: &str,
    ) -> Result<bool> {
        let events = self
            .read_aggregate(aggregate_id, aggregate_type, Version::first())
            .await?;
        Ok(!events.is_empty())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}
