use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventFilter, EventId, EventPage, EventRecord, EventStoreError, NewEvent,
    ProjectionSnapshot, Result, Sequence, Snapshot, StoreStats, Version,
    store::{EventStore, EventStream},
};

#[derive(Default)]
struct LogState {
    events: Vec<EventRecord>,
    next_sequence: i64,
}

impl LogState {
    fn max_version(&self, aggregate_id: &AggregateId, aggregate_type: &str) -> Version {
        self.events
            .iter()
            .filter(|e| &e.aggregate_id == aggregate_id && e.aggregate_type == aggregate_type)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial())
    }

    fn version_taken(&self, aggregate_id: &AggregateId, aggregate_type: &str, version: Version) -> bool {
        self.events.iter().any(|e| {
            &e.aggregate_id == aggregate_id
                && e.aggregate_type == aggregate_type
                && e.version == version
        })
    }
}

/// In-memory event log for testing and single-process deployments.
///
/// Provides the same interface and failure semantics as the PostgreSQL
/// implementation. The single write lock serializes appends, so the
/// version race of concurrent writers cannot occur naturally here;
/// [`append_at_version`](InMemoryEventStore::append_at_version) exists to
/// exercise the uniqueness-constraint path anyway.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<LogState>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
    projections: Arc<RwLock<HashMap<(String, AggregateId), ProjectionSnapshot>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.events.len()
    }

    /// Clears all events, snapshots, and projection rows.
    pub async fn clear(&self) {
        let mut log = self.log.write().await;
        log.events.clear();
        log.next_sequence = 0;
        self.snapshots.write().await.clear();
        self.projections.write().await.clear();
    }

    /// Attempts to claim an explicit version, as a concurrent writer that
    /// already computed its next version would. Fails with
    /// [`EventStoreError::Conflict`] if the version is taken.
    pub async fn append_at_version(&self, event: NewEvent, version: Version) -> Result<EventRecord> {
        let mut log = self.log.write().await;
        self.insert_locked(&mut log, event, version)
    }

    fn insert_locked(
        &self,
        log: &mut LogState,
        event: NewEvent,
        version: Version,
    ) -> Result<EventRecord> {
        if log.version_taken(&event.aggregate_id, &event.aggregate_type, version) {
            return Err(EventStoreError::Conflict {
                aggregate_id: event.aggregate_id,
                aggregate_type: event.aggregate_type,
                version,
            });
        }

        log.next_sequence += 1;
        let record = EventRecord {
            event_id: EventId::new(),
            event_type: event.event_type,
            aggregate_id: event.aggregate_id,
            aggregate_type: event.aggregate_type,
            version,
            sequence: Sequence::new(log.next_sequence),
            timestamp: Utc::now(),
            payload: event.payload,
            metadata: event.metadata,
        };
        log.events.push(record.clone());
        metrics::counter!("events_appended_total").increment(1);
        Ok(record)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<EventRecord> {
        let mut log = self.log.write().await;
        let next_version = log
            .max_version(&event.aggregate_id, &event.aggregate_type)
            .next();
        self.insert_locked(&mut log, event, next_version)
    }

    async fn read_aggregate(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: &str,
        from_version: Version,
    ) -> Result<Vec<EventRecord>> {
        let log = self.log.read().await;
        let mut events: Vec<_> = log
            .events
            .iter()
            .filter(|e| {
                &e.aggregate_id == aggregate_id
                    && e.aggregate_type == aggregate_type
                    && e.version >= from_version
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn read_all(&self, filter: &EventFilter) -> Result<EventPage> {
        let log = self.log.read().await;
        let mut events: Vec<_> = log
            .events
            .iter()
            .filter(|e| match &filter.event_type {
                Some(t) => &e.event_type == t,
                None => true,
            })
            .cloned()
            .collect();

        let total_count = events.len() as u64;
        events.sort_by(|a, b| b.sequence.cmp(&a.sequence));

        let events = events
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size as usize)
            .collect();

        Ok(EventPage {
            events,
            total_count,
        })
    }

    async fn read_since(
        &self,
        from_sequence: Sequence,
        event_types: &[String],
    ) -> Result<EventStream> {
        use futures_util::stream;

        let log = self.log.read().await;
        let mut events: Vec<_> = log
            .events
            .iter()
            .filter(|e| {
                e.sequence >= from_sequence
                    && (event_types.is_empty() || event_types.contains(&e.event_type))
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence);

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn stats(&self) -> Result<StoreStats> {
        use std::collections::HashSet;

        let log = self.log.read().await;
        let aggregate_types: HashSet<_> = log.events.iter().map(|e| &e.aggregate_type).collect();
        let event_types: HashSet<_> = log.events.iter().map(|e| &e.event_type).collect();

        Ok(StoreStats {
            total_events: log.events.len() as u64,
            distinct_aggregate_types: aggregate_types.len() as u64,
            distinct_event_types: event_types.len() as u64,
            latest_sequence: log.events.iter().map(|e| e.sequence).max(),
        })
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(aggregate_id).cloned())
    }

    async fn upsert_projection(&self, snapshot: ProjectionSnapshot) -> Result<()> {
        let mut projections = self.projections.write().await;
        projections.insert(
            (
                snapshot.projection_name.clone(),
                snapshot.aggregate_id.clone(),
            ),
            snapshot,
        );
        Ok(())
    }

    async fn get_projection(
        &self,
        projection_name: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<ProjectionSnapshot>> {
        let projections = self.projections.read().await;
        Ok(projections
            .get(&(projection_name.to_string(), aggregate_id.clone()))
            .cloned())
    }

    async fn list_projections(&self, projection_name: &str) -> Result<Vec<ProjectionSnapshot>> {
        let projections = self.projections.read().await;
        let mut rows: Vec<_> = projections
            .values()
            .filter(|p| p.projection_name == projection_name)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.aggregate_id.cmp(&b.aggregate_id));
        Ok(rows)
    }

    async fn clear_projection(&self, projection_name: &str) -> Result<u64> {
        let mut projections = self.projections.write().await;
        let before = projections.len();
        projections.retain(|(name, _), _| name != projection_name);
        Ok((before - projections.len()) as u64)
    }
}
