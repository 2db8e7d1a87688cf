use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, EventId, Version};

/// A point-in-time snapshot of an aggregate's state.
///
/// Optional: nothing in the log requires snapshots, but callers that
/// rebuild aggregate state can store one to avoid replaying the full
/// history. At most one snapshot is kept per aggregate (upsert).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The aggregate this snapshot belongs to.
    pub aggregate_id: AggregateId,

    /// The logical category of that aggregate.
    pub aggregate_type: String,

    /// The aggregate's event version at the time of the snapshot.
    pub version: Version,

    /// When the snapshot was created.
    pub timestamp: DateTime<Utc>,

    /// The serialized aggregate state.
    pub state: serde_json::Value,
}

impl Snapshot {
    /// Creates a new snapshot.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            timestamp: Utc::now(),
            state,
        }
    }

    /// Creates a snapshot from a serializable state.
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            timestamp: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the snapshot state into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}

/// The materialized value of one projection for one aggregate.
///
/// Keyed by `(projection_name, aggregate_id)`. Created on the first
/// qualifying event, updated in place by each subsequent one, and only
/// removed by an explicit clear before a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionSnapshot {
    /// Name of the projection that owns this row.
    pub projection_name: String,

    /// The aggregate this row describes.
    pub aggregate_id: AggregateId,

    /// The folded read-model state.
    pub data: serde_json::Value,

    /// Number of times this row has been updated. Monotonic, independent
    /// of the event version.
    pub version: i64,

    /// The event that produced the current `data`, for auditability.
    pub last_event_id: EventId,

    /// When this row was last written.
    pub updated_at: DateTime<Utc>,
}

impl ProjectionSnapshot {
    /// Creates the first row for `(projection_name, aggregate_id)`.
    pub fn first(
        projection_name: impl Into<String>,
        aggregate_id: AggregateId,
        data: serde_json::Value,
        last_event_id: EventId,
    ) -> Self {
        Self {
            projection_name: projection_name.into(),
            aggregate_id,
            data,
            version: 1,
            last_event_id,
            updated_at: Utc::now(),
        }
    }

    /// Produces the successor row after folding one more event.
    pub fn updated(&self, data: serde_json::Value, last_event_id: EventId) -> Self {
        Self {
            projection_name: self.projection_name.clone(),
            aggregate_id: self.aggregate_id.clone(),
            data,
            version: self.version + 1,
            last_event_id,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestState {
        value: i32,
        name: String,
    }

    #[test]
    fn snapshot_new() {
        let id = AggregateId::new("order-1");
        let state = serde_json::json!({"value": 42});

        let snapshot = Snapshot::new(id.clone(), "Order", Version::new(5), state.clone());

        assert_eq!(snapshot.aggregate_id, id);
        assert_eq!(snapshot.aggregate_type, "Order");
        assert_eq!(snapshot.version, Version::new(5));
        assert_eq!(snapshot.state, state);
    }

    #[test]
    fn snapshot_from_state_and_into_state() {
        let id = AggregateId::new("order-1");
        let original = TestState {
            value: 42,
            name: "test".to_string(),
        };

        let snapshot = Snapshot::from_state(id, "Order", Version::new(5), &original).unwrap();

        let restored: TestState = snapshot.into_state().unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn projection_snapshot_first_starts_at_version_one() {
        let event_id = EventId::new();
        let row = ProjectionSnapshot::first(
            "order-summary",
            AggregateId::new("order-1"),
            serde_json::json!({"status": "created"}),
            event_id,
        );

        assert_eq!(row.version, 1);
        assert_eq!(row.last_event_id, event_id);
    }

    #[test]
    fn projection_snapshot_updated_increments_version() {
        let row = ProjectionSnapshot::first(
            "order-summary",
            AggregateId::new("order-1"),
            serde_json::json!({"status": "created"}),
            EventId::new(),
        );

        let next_event = EventId::new();
        let updated = row.updated(serde_json::json!({"status": "confirmed"}), next_event);

        assert_eq!(updated.version, 2);
        assert_eq!(updated.last_event_id, next_event);
        assert_eq!(updated.aggregate_id, row.aggregate_id);
        assert_eq!(updated.data, serde_json::json!({"status": "confirmed"}));
    }
}
