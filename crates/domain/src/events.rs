//! Typed payloads for the event types this system knows about.
//!
//! Payloads travel as JSON and are opaque to the log; these structs are
//! how the resolver and the projection folds interpret them.

use serde::{Deserialize, Serialize};

/// Wire names of the known event types.
pub mod event_types {
    pub const ORDER_CREATED: &str = "order.created";
    pub const ORDER_STATUS_CHANGED: &str = "order.status_changed";
    pub const ORDER_CANCELLED: &str = "order.cancelled";
    pub const USER_REGISTERED: &str = "user.registered";
    pub const USER_PROFILE_UPDATED: &str = "user.profile_updated";
    pub const PAYMENT_RECORDED: &str = "payment.recorded";
}

/// Logical aggregate categories.
pub mod aggregate_types {
    pub const ORDER: &str = "Order";
    pub const USER: &str = "User";
    pub const PAYMENT: &str = "Payment";

    /// Sentinel category for events whose type is not recognized.
    pub const UNKNOWN: &str = "Unknown";
}

/// Payload of `order.created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: u64,
    pub customer_id: String,
    #[serde(default)]
    pub total_cents: i64,
}

/// Payload of `order.status_changed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: u64,
    pub status: String,
}

/// Payload of `order.cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: u64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Payload of `user.registered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: u64,
    pub email: String,
    pub display_name: String,
}

/// Payload of `user.profile_updated`. Absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileUpdated {
    pub user_id: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Payload of `payment.recorded`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub payment_id: u64,
    pub order_id: u64,
    pub amount_cents: i64,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_created_deserializes_without_total() {
        let payload: OrderCreated =
            serde_json::from_value(serde_json::json!({"order_id": 42, "customer_id": "customer-1"}))
                .unwrap();
        assert_eq!(payload.order_id, 42);
        assert_eq!(payload.total_cents, 0);
    }

    #[test]
    fn profile_update_fields_are_optional() {
        let payload: UserProfileUpdated =
            serde_json::from_value(serde_json::json!({"user_id": 7})).unwrap();
        assert!(payload.email.is_none());
        assert!(payload.display_name.is_none());
    }

    #[test]
    fn payment_recorded_roundtrip() {
        let payload = PaymentRecorded {
            payment_id: 1,
            order_id: 42,
            amount_cents: 5500,
            currency: "USD".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["currency"], "USD");
        let back: PaymentRecorded = serde_json::from_value(json).unwrap();
        assert_eq!(back.amount_cents, 5500);
    }
}
