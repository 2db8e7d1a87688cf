use serde::Serialize;

use crate::{EventRecord, Sequence};

/// Filter and pagination parameters for reading across all aggregates.
///
/// Results are ordered descending by sequence (most recent first) and
/// paginated with a 1-based page number over the filtered set.
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Restrict to exact matches on event type, when present.
    pub event_type: Option<String>,

    /// 1-based page number.
    pub page: u64,

    /// Number of events per page.
    pub page_size: u64,
}

impl EventFilter {
    /// Creates a filter for the first page with the default page size (50).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to a single event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the 1-based page number. Page 0 is treated as page 1.
    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size.
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Number of events to skip for the requested page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.page_size
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            event_type: None,
            page: 1,
            page_size: 50,
        }
    }
}

/// One page of events plus the total count over the filtered set.
#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<EventRecord>,
    pub total_count: u64,
}

/// Aggregate counts over the whole log, recomputed on each call.
///
/// Consistent as of the moment of the query; no isolation guarantee
/// against concurrent appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_events: u64,
    pub distinct_aggregate_types: u64,
    pub distinct_event_types: u64,
    /// Highest sequence assigned so far; None for an empty log.
    pub latest_sequence: Option<Sequence>,
}
