//! User directory read model.

use domain::events::{UserProfileUpdated, UserRegistered, event_types};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FoldError;
use crate::projection::{FoldContext, ProjectionDef};

/// Name of this projection.
pub const NAME: &str = "user-directory";

/// Snapshot data of the user directory projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDirectoryEntry {
    pub user_id: u64,
    pub email: String,
    pub display_name: String,
    /// Number of profile updates applied since registration.
    pub updates: u64,
}

/// Builds the projection definition for registration.
pub fn projection() -> ProjectionDef {
    ProjectionDef::new(
        NAME,
        [event_types::USER_REGISTERED, event_types::USER_PROFILE_UPDATED],
        fold,
    )
}

fn fold(ctx: &FoldContext<'_>) -> Result<Option<Value>, FoldError> {
    match ctx.event_type {
        event_types::USER_REGISTERED => {
            let payload: UserRegistered = serde_json::from_value(ctx.payload.clone())?;
            let entry = UserDirectoryEntry {
                user_id: payload.user_id,
                email: payload.email,
                display_name: payload.display_name,
                updates: 0,
            };
            Ok(Some(serde_json::to_value(entry)?))
        }
        event_types::USER_PROFILE_UPDATED => {
            // An update before registration has no entry to fold onto
            let Some(previous) = ctx.previous else {
                return Ok(None);
            };
            let mut entry: UserDirectoryEntry = serde_json::from_value(previous.clone())?;
            let payload: UserProfileUpdated = serde_json::from_value(ctx.payload.clone())?;
            if let Some(email) = payload.email {
                entry.email = email;
            }
            if let Some(display_name) = payload.display_name {
                entry.display_name = display_name;
            }
            entry.updates += 1;
            Ok(Some(serde_json::to_value(entry)?))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;

    fn registered() -> Value {
        serde_json::json!({
            "user_id": 7, "email": "a@example.com", "display_name": "Ada"
        })
    }

    #[test]
    fn registration_creates_entry() {
        let id = AggregateId::new("user-7");
        let payload = registered();
        let result = fold(&FoldContext {
            event_type: event_types::USER_REGISTERED,
            aggregate_id: &id,
            payload: &payload,
            previous: None,
        })
        .unwrap()
        .unwrap();

        let entry: UserDirectoryEntry = serde_json::from_value(result).unwrap();
        assert_eq!(entry.email, "a@example.com");
        assert_eq!(entry.updates, 0);
    }

    #[test]
    fn update_merges_present_fields_only() {
        let id = AggregateId::new("user-7");
        let payload = registered();
        let first = fold(&FoldContext {
            event_type: event_types::USER_REGISTERED,
            aggregate_id: &id,
            payload: &payload,
            previous: None,
        })
        .unwrap()
        .unwrap();

        let update = serde_json::json!({"user_id": 7, "display_name": "Ada L."});
        let result = fold(&FoldContext {
            event_type: event_types::USER_PROFILE_UPDATED,
            aggregate_id: &id,
            payload: &update,
            previous: Some(&first),
        })
        .unwrap()
        .unwrap();

        let entry: UserDirectoryEntry = serde_json::from_value(result).unwrap();
        assert_eq!(entry.display_name, "Ada L.");
        assert_eq!(entry.email, "a@example.com");
        assert_eq!(entry.updates, 1);
    }

    #[test]
    fn update_before_registration_folds_to_none() {
        let id = AggregateId::new("user-7");
        let update = serde_json::json!({"user_id": 7, "email": "b@example.com"});

        let result = fold(&FoldContext {
            event_type: event_types::USER_PROFILE_UPDATED,
            aggregate_id: &id,
            payload: &update,
            previous: None,
        })
        .unwrap();
        assert!(result.is_none());
    }
}
