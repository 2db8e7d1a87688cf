//! Concrete read model views and the default registry.

pub mod order_summary;
pub mod payment_ledger;
pub mod user_directory;

pub use order_summary::OrderSummary;
pub use payment_ledger::PaymentEntry;
pub use user_directory::UserDirectoryEntry;

use crate::projection::ProjectionRegistry;

/// Builds the registry with every built-in view, ready for the engine.
pub fn default_registry() -> ProjectionRegistry {
    let mut registry = ProjectionRegistry::new();
    registry.register(order_summary::projection());
    registry.register(user_directory::projection());
    registry.register(payment_ledger::projection());
    registry
}
