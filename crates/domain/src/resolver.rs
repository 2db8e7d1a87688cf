//! Maps an event's type and payload to the aggregate it belongs to.

use common::AggregateId;
use serde_json::Value;

use crate::events::{aggregate_types, event_types};

/// The aggregate identity an event resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRef {
    pub aggregate_id: AggregateId,
    pub aggregate_type: &'static str,
}

impl AggregateRef {
    /// Sentinel for unrecognized events. They are still logged, for
    /// forward compatibility, but no projection picks them up unless it
    /// explicitly lists their type.
    pub fn unknown() -> Self {
        Self {
            aggregate_id: AggregateId::unknown(),
            aggregate_type: aggregate_types::UNKNOWN,
        }
    }
}

/// Resolves an event type and payload to `(aggregate_id, aggregate_type)`.
///
/// The mapping is a fixed table: each known event type names the payload
/// field carrying the entity's id and the prefix that turns it into an
/// aggregate identity (`order.created` + `{"order_id": 42}` resolves to
/// `order-42` / `Order`). Unknown event types, and known types whose
/// payload lacks the id field, resolve to the sentinel rather than
/// failing.
pub fn resolve(event_type: &str, payload: &Value) -> AggregateRef {
    match event_type {
        event_types::ORDER_CREATED
        | event_types::ORDER_STATUS_CHANGED
        | event_types::ORDER_CANCELLED => {
            extract(payload, "order_id", "order", aggregate_types::ORDER)
        }
        event_types::USER_REGISTERED | event_types::USER_PROFILE_UPDATED => {
            extract(payload, "user_id", "user", aggregate_types::USER)
        }
        event_types::PAYMENT_RECORDED => {
            extract(payload, "payment_id", "payment", aggregate_types::PAYMENT)
        }
        _ => AggregateRef::unknown(),
    }
}

fn extract(payload: &Value, field: &str, prefix: &str, aggregate_type: &'static str) -> AggregateRef {
    let raw = match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return AggregateRef::unknown(),
    };

    AggregateRef {
        aggregate_id: AggregateId::new(format!("{prefix}-{raw}")),
        aggregate_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_events_resolve_to_order_aggregate() {
        for event_type in [
            event_types::ORDER_CREATED,
            event_types::ORDER_STATUS_CHANGED,
            event_types::ORDER_CANCELLED,
        ] {
            let resolved = resolve(event_type, &serde_json::json!({"order_id": 42}));
            assert_eq!(resolved.aggregate_id.as_str(), "order-42");
            assert_eq!(resolved.aggregate_type, aggregate_types::ORDER);
        }
    }

    #[test]
    fn user_and_payment_events_resolve() {
        let user = resolve(
            event_types::USER_REGISTERED,
            &serde_json::json!({"user_id": 7, "email": "a@example.com"}),
        );
        assert_eq!(user.aggregate_id.as_str(), "user-7");
        assert_eq!(user.aggregate_type, aggregate_types::USER);

        let payment = resolve(
            event_types::PAYMENT_RECORDED,
            &serde_json::json!({"payment_id": 3, "order_id": 42}),
        );
        assert_eq!(payment.aggregate_id.as_str(), "payment-3");
        assert_eq!(payment.aggregate_type, aggregate_types::PAYMENT);
    }

    #[test]
    fn string_ids_are_accepted() {
        let resolved = resolve(
            event_types::ORDER_CREATED,
            &serde_json::json!({"order_id": "abc"}),
        );
        assert_eq!(resolved.aggregate_id.as_str(), "order-abc");
    }

    #[test]
    fn unrecognized_event_type_resolves_to_sentinel() {
        let resolved = resolve("inventory.adjusted", &serde_json::json!({"sku": "X"}));
        assert_eq!(resolved, AggregateRef::unknown());
        assert_eq!(resolved.aggregate_id.as_str(), "unknown");
        assert_eq!(resolved.aggregate_type, "Unknown");
    }

    #[test]
    fn missing_id_field_resolves_to_sentinel() {
        let resolved = resolve(event_types::ORDER_CREATED, &serde_json::json!({"status": "x"}));
        assert_eq!(resolved, AggregateRef::unknown());
    }

    #[test]
    fn empty_string_id_resolves_to_sentinel() {
        let resolved = resolve(event_types::ORDER_CREATED, &serde_json::json!({"order_id": ""}));
        assert_eq!(resolved, AggregateRef::unknown());
    }
}
