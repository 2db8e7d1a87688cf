//! Materialized read models folded incrementally from the event log.
//!
//! A projection is data — its name and the event types it consumes —
//! plus a pure fold function, registered once at startup:
//! - [`ProjectionDef`] / [`ProjectionRegistry`] — the strategy table
//! - [`ProjectionEngine`] — folds appended events into snapshots,
//!   isolates per-projection failures, and replays history on demand
//! - [`views`] — the built-in read models

pub mod engine;
pub mod error;
pub mod health;
pub mod projection;
pub mod views;

pub use engine::ProjectionEngine;
pub use error::{FoldError, ProjectionError, Result};
pub use health::ProjectionHealth;
pub use projection::{FoldContext, FoldFn, ProjectionDef, ProjectionRegistry};
pub use views::default_registry;
