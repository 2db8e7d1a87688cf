//! HTTP surface for the event log, projections, and statistics.
//!
//! A thin translation layer: requests become event log and projection
//! engine operations, with structured logging (tracing) and Prometheus
//! metrics. No domain logic lives here.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{ProjectionEngine, default_registry};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::events::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/events", post(routes::events::append::<S>))
        .route("/events", get(routes::events::list::<S>))
        .route(
            "/aggregates/{aggregate_type}/{aggregate_id}/events",
            get(routes::events::history::<S>),
        )
        .route("/projections/{name}", get(routes::projections::list::<S>))
        .route(
            "/projections/{name}/{aggregate_id}",
            get(routes::projections::get::<S>),
        )
        .route(
            "/projections/{name}/replay",
            post(routes::projections::replay::<S>),
        )
        .route("/stats", get(routes::stats::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: the given store, the built-in
/// projection registry, and the configured append retry policy.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let engine = Arc::new(ProjectionEngine::new(store.clone(), default_registry()));

    Arc::new(AppState {
        store,
        engine,
        retry: config.retry_policy(),
    })
}
