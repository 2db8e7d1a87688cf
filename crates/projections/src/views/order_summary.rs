//! Order summary read model — one row per order with its status history.

use domain::events::{OrderCancelled, OrderCreated, OrderStatusChanged, event_types};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FoldError;
use crate::projection::{FoldContext, ProjectionDef};

/// Name of this projection.
pub const NAME: &str = "order-summary";

/// Snapshot data of the order summary projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub order_id: u64,
    pub customer_id: String,
    pub status: String,
    /// Every status the order has passed through, in event order.
    pub status_history: Vec<String>,
    pub total_cents: i64,
    #[serde(default)]
    pub cancelled_reason: Option<String>,
}

/// Builds the projection definition for registration.
pub fn projection() -> ProjectionDef {
    ProjectionDef::new(
        NAME,
        [
            event_types::ORDER_CREATED,
            event_types::ORDER_STATUS_CHANGED,
            event_types::ORDER_CANCELLED,
        ],
        fold,
    )
}

fn fold(ctx: &FoldContext<'_>) -> Result<Option<Value>, FoldError> {
    match ctx.event_type {
        event_types::ORDER_CREATED => {
            let payload: OrderCreated = serde_json::from_value(ctx.payload.clone())?;
            let summary = OrderSummary {
                order_id: payload.order_id,
                customer_id: payload.customer_id,
                status: "created".to_string(),
                status_history: vec!["created".to_string()],
                total_cents: payload.total_cents,
                cancelled_reason: None,
            };
            Ok(Some(serde_json::to_value(summary)?))
        }
        event_types::ORDER_STATUS_CHANGED => {
            // A status change before the order exists has nothing to fold onto
            let Some(previous) = ctx.previous else {
                return Ok(None);
            };
            let mut summary: OrderSummary = serde_json::from_value(previous.clone())?;
            let payload: OrderStatusChanged = serde_json::from_value(ctx.payload.clone())?;
            summary.status = payload.status.clone();
            summary.status_history.push(payload.status);
            Ok(Some(serde_json::to_value(summary)?))
        }
        event_types::ORDER_CANCELLED => {
            let Some(previous) = ctx.previous else {
                return Ok(None);
            };
            let mut summary: OrderSummary = serde_json::from_value(previous.clone())?;
            let payload: OrderCancelled = serde_json::from_value(ctx.payload.clone())?;
            summary.status = "cancelled".to_string();
            summary.status_history.push("cancelled".to_string());
            summary.cancelled_reason = payload.reason;
            Ok(Some(serde_json::to_value(summary)?))
        }
        _ => Ok(None),
    }
}
