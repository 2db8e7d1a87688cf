//! Integration tests: append → resolver → ProjectionEngine → snapshots.

use common::AggregateId;
use domain::resolve;
use event_store::{
    EventRecord, EventStore, EventStoreExt, InMemoryEventStore, NewEvent, RetryPolicy, Sequence,
};
use projections::views::{OrderSummary, order_summary, payment_ledger, user_directory};
use projections::{ProjectionEngine, default_registry};

/// Appends an event the way the command layer does: resolve the
/// aggregate from the payload, append durably, return the record.
async fn append(
    store: &InMemoryEventStore,
    event_type: &str,
    payload: serde_json::Value,
) -> EventRecord {
    let resolved = resolve(event_type, &payload);
    let event = NewEvent::builder()
        .aggregate_id(resolved.aggregate_id)
        .aggregate_type(resolved.aggregate_type)
        .event_type(event_type)
        .payload_raw(payload)
        .build();
    store
        .append_with_retry(event, &RetryPolicy::default())
        .await
        .unwrap()
}

/// Appends and immediately folds, the full write path.
async fn submit(
    store: &InMemoryEventStore,
    engine: &ProjectionEngine<InMemoryEventStore>,
    event_type: &str,
    payload: serde_json::Value,
) -> EventRecord {
    let record = append(store, event_type, payload).await;
    engine.on_event(&record).await;
    record
}

fn setup() -> (InMemoryEventStore, ProjectionEngine<InMemoryEventStore>) {
    let store = InMemoryEventStore::new();
    let engine = ProjectionEngine::new(store.clone(), default_registry());
    (store, engine)
}

#[tokio::test]
async fn order_lifecycle_builds_summary_with_history() {
    let (store, engine) = setup();

    submit(
        &store,
        &engine,
        "order.created",
        serde_json::json!({"order_id": 1, "customer_id": "customer-9", "total_cents": 5500}),
    )
    .await;
    submit(
        &store,
        &engine,
        "order.status_changed",
        serde_json::json!({"order_id": 1, "status": "confirmed"}),
    )
    .await;

    let snapshot = engine
        .get_snapshot(order_summary::NAME, &AggregateId::new("order-1"))
        .await
        .unwrap()
        .unwrap();
    let summary: OrderSummary = serde_json::from_value(snapshot.data).unwrap();

    assert_eq!(summary.status, "confirmed");
    assert_eq!(summary.status_history.len(), 2);
    assert_eq!(summary.status_history, vec!["created", "confirmed"]);
    assert_eq!(snapshot.version, 2);

    // Both events are durable with gapless versions.
    let events = store
        .read_aggregate(
            &AggregateId::new("order-1"),
            "Order",
            event_store::Version::first(),
        )
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn events_fan_out_to_their_own_projections() {
    let (store, engine) = setup();

    submit(
        &store,
        &engine,
        "order.created",
        serde_json::json!({"order_id": 1, "customer_id": "customer-9"}),
    )
    .await;
    submit(
        &store,
        &engine,
        "user.registered",
        serde_json::json!({"user_id": 7, "email": "a@example.com", "display_name": "Ada"}),
    )
    .await;
    submit(
        &store,
        &engine,
        "payment.recorded",
        serde_json::json!({"payment_id": 3, "order_id": 1, "amount_cents": 5500, "currency": "USD"}),
    )
    .await;

    assert_eq!(
        engine.list_snapshots(order_summary::NAME).await.unwrap().len(),
        1
    );
    assert_eq!(
        engine.list_snapshots(user_directory::NAME).await.unwrap().len(),
        1
    );
    assert_eq!(
        engine.list_snapshots(payment_ledger::NAME).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn unknown_event_types_are_logged_but_project_nowhere() {
    let (store, engine) = setup();

    let record = submit(
        &store,
        &engine,
        "inventory.adjusted",
        serde_json::json!({"sku": "X-1", "delta": -2}),
    )
    .await;

    assert_eq!(record.aggregate_id.as_str(), "unknown");
    assert_eq!(record.aggregate_type, "Unknown");
    assert_eq!(store.event_count().await, 1);

    for name in [order_summary::NAME, user_directory::NAME, payment_ledger::NAME] {
        assert!(engine.list_snapshots(name).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn replay_reproduces_incremental_snapshots() {
    // Incremental path: on_event after every append.
    let (store_a, engine_a) = setup();
    // Replay path: append everything first, fold nothing.
    let (store_b, engine_b) = setup();

    let batches = [
        (
            "order.created",
            serde_json::json!({"order_id": 1, "customer_id": "customer-9", "total_cents": 1000}),
        ),
        (
            "order.created",
            serde_json::json!({"order_id": 2, "customer_id": "customer-4", "total_cents": 2500}),
        ),
        (
            "order.status_changed",
            serde_json::json!({"order_id": 1, "status": "confirmed"}),
        ),
        (
            "order.cancelled",
            serde_json::json!({"order_id": 2, "reason": "changed mind"}),
        ),
        (
            "order.status_changed",
            serde_json::json!({"order_id": 1, "status": "shipped"}),
        ),
    ];

    for (event_type, payload) in &batches {
        submit(&store_a, &engine_a, event_type, payload.clone()).await;
        append(&store_b, event_type, payload.clone()).await;
    }

    let replayed = engine_b
        .replay(order_summary::NAME, Sequence::first())
        .await
        .unwrap();
    assert_eq!(replayed, 5);

    let incremental = engine_a.list_snapshots(order_summary::NAME).await.unwrap();
    let rebuilt = engine_b.list_snapshots(order_summary::NAME).await.unwrap();

    assert_eq!(incremental.len(), rebuilt.len());
    for (a, b) in incremental.iter().zip(rebuilt.iter()) {
        assert_eq!(a.aggregate_id, b.aggregate_id);
        assert_eq!(a.data, b.data);
        assert_eq!(a.version, b.version);
    }
}

#[tokio::test]
async fn replay_after_clear_rebuilds_from_scratch() {
    let (store, engine) = setup();

    submit(
        &store,
        &engine,
        "order.created",
        serde_json::json!({"order_id": 1, "customer_id": "customer-9"}),
    )
    .await;
    submit(
        &store,
        &engine,
        "order.status_changed",
        serde_json::json!({"order_id": 1, "status": "confirmed"}),
    )
    .await;

    let before = engine
        .get_snapshot(order_summary::NAME, &AggregateId::new("order-1"))
        .await
        .unwrap()
        .unwrap();

    // Operator repair: clear, then replay from the beginning.
    store.clear_projection(order_summary::NAME).await.unwrap();
    assert!(
        engine
            .get_snapshot(order_summary::NAME, &AggregateId::new("order-1"))
            .await
            .unwrap()
            .is_none()
    );

    engine
        .replay(order_summary::NAME, Sequence::first())
        .await
        .unwrap();

    let after = engine
        .get_snapshot(order_summary::NAME, &AggregateId::new("order-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.data, before.data);
    assert_eq!(after.version, before.version);
}

#[tokio::test]
async fn partial_replay_layers_onto_existing_snapshots() {
    let (store, engine) = setup();

    let first = submit(
        &store,
        &engine,
        "order.created",
        serde_json::json!({"order_id": 1, "customer_id": "customer-9"}),
    )
    .await;
    submit(
        &store,
        &engine,
        "order.status_changed",
        serde_json::json!({"order_id": 1, "status": "confirmed"}),
    )
    .await;

    // Replaying only the tail re-folds the status change onto the
    // existing snapshot: incremental catch-up, not a rebuild.
    let replayed = engine
        .replay(order_summary::NAME, first.sequence.next())
        .await
        .unwrap();
    assert_eq!(replayed, 1);

    let snapshot = engine
        .get_snapshot(order_summary::NAME, &AggregateId::new("order-1"))
        .await
        .unwrap()
        .unwrap();
    let summary: OrderSummary = serde_json::from_value(snapshot.data).unwrap();
    assert_eq!(summary.status_history, vec!["created", "confirmed", "confirmed"]);
    assert_eq!(snapshot.version, 3);
}

#[tokio::test]
async fn out_of_order_prerequisites_write_nothing() {
    let (store, engine) = setup();

    // A profile update for a user that never registered.
    submit(
        &store,
        &engine,
        "user.profile_updated",
        serde_json::json!({"user_id": 7, "email": "b@example.com"}),
    )
    .await;

    assert!(
        engine
            .get_snapshot(user_directory::NAME, &AggregateId::new("user-7"))
            .await
            .unwrap()
            .is_none()
    );

    // Not an error: the event is durable and health stays clean.
    assert_eq!(store.event_count().await, 1);
    let health = engine.health(user_directory::NAME).await.unwrap();
    assert_eq!(health.failures, 0);
    assert_eq!(health.events_applied, 0);
}

#[tokio::test]
async fn fold_failures_are_isolated_and_observable() {
    let (store, engine) = setup();

    // order.created with a payload the order-summary fold cannot read.
    // The resolver falls back to the sentinel, but order-summary still
    // consumes the type and its fold fails on the missing order_id.
    submit(
        &store,
        &engine,
        "order.created",
        serde_json::json!({"customer_id": "customer-9"}),
    )
    .await;

    let health = engine.health(order_summary::NAME).await.unwrap();
    assert_eq!(health.failures, 1);
    assert!(health.last_error.is_some());

    // The event is durable despite the fold failure.
    assert_eq!(store.event_count().await, 1);

    // Other projections are untouched and healthy.
    let user_health = engine.health(user_directory::NAME).await.unwrap();
    assert_eq!(user_health.failures, 0);

    // The log keeps accepting and folding later events.
    submit(
        &store,
        &engine,
        "order.created",
        serde_json::json!({"order_id": 2, "customer_id": "customer-4"}),
    )
    .await;
    assert!(
        engine
            .get_snapshot(order_summary::NAME, &AggregateId::new("order-2"))
            .await
            .unwrap()
            .is_some()
    );
}
