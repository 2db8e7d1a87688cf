//! Per-projection progress and failure tracking.

use serde::Serialize;

/// Observable state of one projection.
///
/// Fold failures never affect event durability or other projections, so
/// this is the only place they become visible; operators watch the
/// failure counter and trigger a replay to repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionHealth {
    /// Events folded into a snapshot write.
    pub events_applied: u64,

    /// Events whose fold or snapshot write failed.
    pub failures: u64,

    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

impl ProjectionHealth {
    /// Records a successful snapshot write.
    pub fn record_applied(&mut self) {
        self.events_applied += 1;
    }

    /// Records a failure.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failures += 1;
        self.last_error = Some(error.into());
    }
}
