//! Payment ledger read model.

use domain::events::{PaymentRecorded, event_types};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FoldError;
use crate::projection::{FoldContext, ProjectionDef};

/// Name of this projection.
pub const NAME: &str = "payment-ledger";

/// Snapshot data of the payment ledger projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentEntry {
    pub payment_id: u64,
    pub order_id: u64,
    pub amount_cents: i64,
    pub currency: String,
}

/// Builds the projection definition for registration.
pub fn projection() -> ProjectionDef {
    ProjectionDef::new(NAME, [event_types::PAYMENT_RECORDED], fold)
}

fn fold(ctx: &FoldContext<'_>) -> Result<Option<Value>, FoldError> {
    match ctx.event_type {
        event_types::PAYMENT_RECORDED => {
            let payload: PaymentRecorded = serde_json::from_value(ctx.payload.clone())?;
            let entry = PaymentEntry {
                payment_id: payload.payment_id,
                order_id: payload.order_id,
                amount_cents: payload.amount_cents,
                currency: payload.currency,
            };
            Ok(Some(serde_json::to_value(entry)?))
        }
        _ => Ok(None),
    }
}
