//! Event append and read endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::resolve;
use event_store::{
    EventFilter, EventPage, EventRecord, EventStore, EventStoreExt, NewEvent, RetryPolicy, Version,
};
use projections::ProjectionEngine;
use serde::Deserialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub store: S,
    pub engine: Arc<ProjectionEngine<S>>,
    pub retry: RetryPolicy,
}

// -- Request types --

#[derive(Deserialize)]
pub struct AppendRequest {
    pub event_type: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub event_type: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub from_version: Option<i64>,
}

// -- Handlers --

/// POST /events — append a domain event and fold it into projections.
///
/// The aggregate identity comes from the resolver, never from the
/// client. The append is durable before any projection runs; fold
/// failures are recorded per projection and do not fail the request.
#[tracing::instrument(skip(state, req), fields(event_type = %req.event_type))]
pub async fn append<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AppendRequest>,
) -> Result<(axum::http::StatusCode, Json<EventRecord>), ApiError> {
    if req.event_type.is_empty() {
        return Err(ApiError::BadRequest("event_type must not be empty".to_string()));
    }

    let resolved = resolve(&req.event_type, &req.payload);

    let mut builder = NewEvent::builder()
        .aggregate_id(resolved.aggregate_id)
        .aggregate_type(resolved.aggregate_type)
        .event_type(req.event_type)
        .payload_raw(req.payload);
    for (key, value) in req.metadata {
        builder = builder.metadata(key, value);
    }

    let record = state
        .store
        .append_with_retry(builder.build(), &state.retry)
        .await?;

    state.engine.on_event(&record).await;

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /events — list events across all aggregates, newest first.
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<EventPage>, ApiError> {
    let mut filter = EventFilter::new();
    if let Some(event_type) = query.event_type {
        filter = filter.event_type(event_type);
    }
    if let Some(page) = query.page {
        filter = filter.page(page);
    }
    if let Some(page_size) = query.page_size {
        if page_size == 0 || page_size > 500 {
            return Err(ApiError::BadRequest(
                "page_size must be between 1 and 500".to_string(),
            ));
        }
        filter = filter.page_size(page_size);
    }

    let page = state.store.read_all(&filter).await?;
    Ok(Json(page))
}

/// GET /aggregates/{aggregate_type}/{aggregate_id}/events — one
/// aggregate's history, ascending by version.
pub async fn history<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((aggregate_type, aggregate_id)): Path<(String, String)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let from_version = Version::new(query.from_version.unwrap_or(1));

    let events = state
        .store
        .read_aggregate(
            &common::AggregateId::new(aggregate_id),
            &aggregate_type,
            from_version,
        )
        .await?;
    Ok(Json(events))
}
