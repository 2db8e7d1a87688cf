//! Log and projection statistics endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use event_store::{EventStore, StoreStats};
use projections::ProjectionHealth;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::events::AppState;

#[derive(Serialize)]
pub struct StatsResponse {
    pub store: StoreStats,
    pub projections: BTreeMap<String, ProjectionHealth>,
}

/// GET /stats — log counts plus per-projection health.
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let store = state.store.stats().await?;
    let projections = state.engine.health_all().await;

    Ok(Json(StatsResponse { store, projections }))
}
