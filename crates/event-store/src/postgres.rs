use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventFilter, EventId, EventPage, EventRecord, EventStoreError, NewEvent,
    ProjectionSnapshot, Result, Sequence, Snapshot, StoreStats, Version,
    store::{EventStore, EventStream},
};

/// Name of the uniqueness constraint on `(aggregate_id, aggregate_type, version)`.
/// Violations of this constraint are version races and map to `Conflict`.
const VERSION_CONSTRAINT: &str = "unique_aggregate_version";

/// PostgreSQL-backed event log.
///
/// Version assignment is read-max-then-insert; correctness under
/// concurrent writers (including other process replicas sharing the same
/// database) relies on the uniqueness constraint rejecting the loser,
/// never on in-process locking.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: PgRow) -> Result<EventRecord> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventRecord {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::new(row.try_get::<String, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            sequence: Sequence::new(row.try_get("sequence")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    fn row_to_projection(row: PgRow) -> Result<ProjectionSnapshot> {
        Ok(ProjectionSnapshot {
            projection_name: row.try_get("projection_name")?,
            aggregate_id: AggregateId::new(row.try_get::<String, _>("aggregate_id")?),
            data: row.try_get("data")?,
            version: row.try_get("version")?,
            last_event_id: EventId::from_uuid(row.try_get::<Uuid, _>("last_event_id")?),
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type, aggregate_id = %event.aggregate_id))]
    async fn append(&self, event: NewEvent) -> Result<EventRecord> {
        let event_id = EventId::new();
        let timestamp = Utc::now();
        let metadata_json = serde_json::to_value(&event.metadata)?;

        // Single conditional insert: the next version is computed inside
        // the statement, so the read-compute-insert window collapses to
        // the insert itself. Concurrent writers computing the same
        // version are still resolved by the uniqueness constraint.
        let row = sqlx::query(
            r#"
            INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
            SELECT $1, $2, $3, $4, COALESCE(MAX(version), 0) + 1, $5, $6, $7
            FROM events
            WHERE aggregate_id = $3 AND aggregate_type = $4
            RETURNING sequence, version
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(&event.event_type)
        .bind(event.aggregate_id.as_str())
        .bind(&event.aggregate_type)
        .bind(timestamp)
        .bind(&event.payload)
        .bind(&metadata_json)
        .fetch_one(&self.pool)
        .await;

        let row = match row {
            Ok(row) => row,
            // A unique violation means a concurrent writer claimed the version
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some(VERSION_CONSTRAINT) =>
            {
                // Best-effort read of the version the winner claimed, for
                // the error report only
                let claimed: Option<i64> = sqlx::query_scalar(
                    "SELECT MAX(version) FROM events WHERE aggregate_id = $1 AND aggregate_type = $2",
                )
                .bind(event.aggregate_id.as_str())
                .bind(&event.aggregate_type)
                .fetch_one(&self.pool)
                .await
                .unwrap_or(None);

                return Err(EventStoreError::Conflict {
                    aggregate_id: event.aggregate_id,
                    aggregate_type: event.aggregate_type,
                    version: Version::new(claimed.unwrap_or(0)),
                });
            }
            Err(e) => return Err(EventStoreError::Unavailable(e)),
        };

        metrics::counter!("events_appended_total").increment(1);

        Ok(EventRecord {
            event_id,
            event_type: event.event_type,
            aggregate_id: event.aggregate_id,
            aggregate_type: event.aggregate_type,
            version: Version::new(row.try_get("version")?),
            sequence: Sequence::new(row.try_get("sequence")?),
            timestamp,
            payload: event.payload,
            metadata: event.metadata,
        })
    }

    async fn read_aggregate(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: &str,
        from_version: Version,
    ) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT sequence, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
            FROM events
            WHERE aggregate_id = $1 AND aggregate_type = $2 AND version >= $3
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id.as_str())
        .bind(aggregate_type)
        .bind(from_version.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn read_all(&self, filter: &EventFilter) -> Result<EventPage> {
        let (total_count, rows) = match &filter.event_type {
            Some(event_type) => {
                let count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE event_type = $1")
                        .bind(event_type)
                        .fetch_one(&self.pool)
                        .await?;

                let rows = sqlx::query(
                    r#"
                    SELECT sequence, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
                    FROM events
                    WHERE event_type = $1
                    ORDER BY sequence DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(event_type)
                .bind(filter.page_size as i64)
                .bind(filter.offset() as i64)
                .fetch_all(&self.pool)
                .await?;

                (count, rows)
            }
            None => {
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
                    .fetch_one(&self.pool)
                    .await?;

                let rows = sqlx::query(
                    r#"
                    SELECT sequence, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
                    FROM events
                    ORDER BY sequence DESC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(filter.page_size as i64)
                .bind(filter.offset() as i64)
                .fetch_all(&self.pool)
                .await?;

                (count, rows)
            }
        };

        let events = rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?;

        Ok(EventPage {
            events,
            total_count: total_count as u64,
        })
    }

    async fn read_since(
        &self,
        from_sequence: Sequence,
        event_types: &[String],
    ) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT sequence, id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
            FROM events
            WHERE sequence >= $1 AND (cardinality($2::text[]) = 0 OR event_type = ANY($2))
            ORDER BY sequence ASC
            "#,
        )
        .bind(from_sequence.as_i64())
        .bind(event_types.to_vec())
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(EventStoreError::Unavailable(e)),
        });

        Ok(Box::pin(stream))
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_events,
                   COUNT(DISTINCT aggregate_type) AS distinct_aggregate_types,
                   COUNT(DISTINCT event_type) AS distinct_event_types,
                   MAX(sequence) AS latest_sequence
            FROM events
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total_events: row.try_get::<i64, _>("total_events")? as u64,
            distinct_aggregate_types: row.try_get::<i64, _>("distinct_aggregate_types")? as u64,
            distinct_event_types: row.try_get::<i64, _>("distinct_event_types")? as u64,
            latest_sequence: row
                .try_get::<Option<i64>, _>("latest_sequence")?
                .map(Sequence::new),
        })
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (aggregate_id, aggregate_type, version, timestamp, state)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (aggregate_id) DO UPDATE SET
                aggregate_type = EXCLUDED.aggregate_type,
                version = EXCLUDED.version,
                timestamp = EXCLUDED.timestamp,
                state = EXCLUDED.state
            "#,
        )
        .bind(snapshot.aggregate_id.as_str())
        .bind(&snapshot.aggregate_type)
        .bind(snapshot.version.as_i64())
        .bind(snapshot.timestamp)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT aggregate_id, aggregate_type, version, timestamp, state
            FROM snapshots
            WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Snapshot {
                aggregate_id: AggregateId::new(row.try_get::<String, _>("aggregate_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                version: Version::new(row.try_get("version")?),
                timestamp: row.try_get("timestamp")?,
                state: row.try_get("state")?,
            })),
            None => Ok(None),
        }
    }

    async fn upsert_projection(&self, snapshot: ProjectionSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projections (projection_name, aggregate_id, data, version, last_event_id, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (projection_name, aggregate_id) DO UPDATE SET
                data = EXCLUDED.data,
                version = EXCLUDED.version,
                last_event_id = EXCLUDED.last_event_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&snapshot.projection_name)
        .bind(snapshot.aggregate_id.as_str())
        .bind(&snapshot.data)
        .bind(snapshot.version)
        .bind(snapshot.last_event_id.as_uuid())
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_projection(
        &self,
        projection_name: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<ProjectionSnapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT projection_name, aggregate_id, data, version, last_event_id, updated_at
            FROM projections
            WHERE projection_name = $1 AND aggregate_id = $2
            "#,
        )
        .bind(projection_name)
        .bind(aggregate_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_projection).transpose()
    }

    async fn list_projections(&self, projection_name: &str) -> Result<Vec<ProjectionSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT projection_name, aggregate_id, data, version, last_event_id, updated_at
            FROM projections
            WHERE projection_name = $1
            ORDER BY aggregate_id ASC
            "#,
        )
        .bind(projection_name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_projection).collect()
    }

    async fn clear_projection(&self, projection_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM projections WHERE projection_name = $1")
            .bind(projection_name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
