use serde::{Deserialize, Serialize};

/// String identity of an aggregate instance, e.g. `"order-42"`.
///
/// Aggregate ids are derived from event payloads (a prefix plus the
/// entity's own id field), so they are strings rather than UUIDs. The
/// newtype keeps them from being mixed up with other string values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates an aggregate ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel identity for events whose type is not recognized.
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AggregateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for AggregateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<AggregateId> for String {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_id_preserves_value() {
        let id = AggregateId::new("order-42");
        assert_eq!(id.as_str(), "order-42");
        assert_eq!(id.to_string(), "order-42");
    }

    #[test]
    fn aggregate_id_unknown_sentinel() {
        assert_eq!(AggregateId::unknown().as_str(), "unknown");
    }

    #[test]
    fn aggregate_id_ordering_is_lexicographic() {
        let a = AggregateId::new("order-1");
        let b = AggregateId::new("order-2");
        assert!(a < b);
    }

    #[test]
    fn aggregate_id_serialization_roundtrip() {
        let id = AggregateId::new("user-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-7\"");
        let deserialized: AggregateId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
