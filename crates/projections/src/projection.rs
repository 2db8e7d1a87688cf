//! Projection definitions: an event-type set plus a pure fold function.

use std::collections::{BTreeMap, BTreeSet};

use common::AggregateId;
use serde_json::Value;

use crate::error::FoldError;

/// Inputs to a fold function: one event plus the projection's current
/// snapshot data for the event's aggregate, if any.
#[derive(Debug)]
pub struct FoldContext<'a> {
    pub event_type: &'a str,
    pub aggregate_id: &'a AggregateId,
    pub payload: &'a Value,
    pub previous: Option<&'a Value>,
}

/// A fold function: `(event, previous snapshot) -> new snapshot`.
///
/// Folds must be deterministic, pure functions of their inputs; they may
/// not perform I/O. Returning `Ok(None)` writes nothing, for events that
/// should not yet produce a materialized view (e.g. missing prerequisite
/// state). The engine always feeds a fold the immediately-next event for
/// its aggregate, in append order.
pub type FoldFn = fn(&FoldContext<'_>) -> Result<Option<Value>, FoldError>;

/// A projection: a name, the event types it consumes, and its fold.
///
/// Plain data plus a function value; there is no handler object and no
/// dynamic dispatch.
#[derive(Clone)]
pub struct ProjectionDef {
    name: &'static str,
    event_types: BTreeSet<String>,
    fold: FoldFn,
}

impl ProjectionDef {
    /// Creates a projection definition.
    pub fn new<I, T>(name: &'static str, event_types: I, fold: FoldFn) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name,
            event_types: event_types.into_iter().map(Into::into).collect(),
            fold,
        }
    }

    /// The projection's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The event types this projection consumes.
    pub fn event_types(&self) -> &BTreeSet<String> {
        &self.event_types
    }

    /// The event types as an owned list, for store-side filtering.
    pub fn event_type_list(&self) -> Vec<String> {
        self.event_types.iter().cloned().collect()
    }

    /// Whether this projection consumes the given event type.
    pub fn interested_in(&self, event_type: &str) -> bool {
        self.event_types.contains(event_type)
    }

    /// Runs the fold.
    pub fn apply(&self, ctx: &FoldContext<'_>) -> Result<Option<Value>, FoldError> {
        (self.fold)(ctx)
    }
}

impl std::fmt::Debug for ProjectionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionDef")
            .field("name", &self.name)
            .field("event_types", &self.event_types)
            .finish_non_exhaustive()
    }
}

/// Ordered registry of projection definitions.
///
/// Built once at process start and treated as read-only thereafter;
/// iteration order is the name order, so runs are reproducible.
#[derive(Debug, Default, Clone)]
pub struct ProjectionRegistry {
    defs: BTreeMap<&'static str, ProjectionDef>,
}

impl ProjectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a projection. Registering a second definition under the
    /// same name replaces the first.
    pub fn register(&mut self, def: ProjectionDef) {
        self.defs.insert(def.name(), def);
    }

    /// Looks up a projection by name.
    pub fn get(&self, name: &str) -> Option<&ProjectionDef> {
        self.defs.get(name)
    }

    /// Iterates over all registered projections in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectionDef> {
        self.defs.values()
    }

    /// Iterates over the projections interested in an event type.
    pub fn interested_in<'a>(
        &'a self,
        event_type: &'a str,
    ) -> impl Iterator<Item = &'a ProjectionDef> {
        self.defs.values().filter(move |def| def.interested_in(event_type))
    }

    /// Number of registered projections.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
