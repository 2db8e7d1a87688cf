//! Projection snapshot and replay endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use event_store::{EventStore, ProjectionSnapshot, Sequence};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::events::AppState;

#[derive(Deserialize, Default)]
pub struct ReplayRequest {
    /// Global sequence to replay from; defaults to the beginning.
    pub from_sequence: Option<i64>,
}

#[derive(Serialize)]
pub struct ReplayResponse {
    pub projection: String,
    pub events_replayed: u64,
}

/// GET /projections/{name} — every snapshot of one projection.
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ProjectionSnapshot>>, ApiError> {
    let snapshots = state.engine.list_snapshots(&name).await?;
    Ok(Json(snapshots))
}

/// GET /projections/{name}/{aggregate_id} — one snapshot.
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((name, aggregate_id)): Path<(String, String)>,
) -> Result<Json<ProjectionSnapshot>, ApiError> {
    let snapshot = state
        .engine
        .get_snapshot(&name, &common::AggregateId::new(aggregate_id.clone()))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no snapshot for {aggregate_id} in {name}"))
        })?;
    Ok(Json(snapshot))
}

/// POST /projections/{name}/replay — re-fold history into snapshots.
///
/// Replays onto existing snapshot state; for a clean rebuild, clear the
/// projection first and replay from sequence 1.
#[tracing::instrument(skip(state, body))]
pub async fn replay<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(name): Path<String>,
    body: Option<Json<ReplayRequest>>,
) -> Result<Json<ReplayResponse>, ApiError> {
    let from_sequence = body
        .map(|Json(req)| req.from_sequence.unwrap_or(1))
        .unwrap_or(1);
    if from_sequence < 1 {
        return Err(ApiError::BadRequest("from_sequence must be >= 1".to_string()));
    }

    let events_replayed = state
        .engine
        .replay(&name, Sequence::new(from_sequence))
        .await?;

    Ok(Json(ReplayResponse {
        projection: name,
        events_replayed,
    }))
}
