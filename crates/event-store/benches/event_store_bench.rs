use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{
    AggregateId, EventFilter, EventStore, InMemoryEventStore, NewEvent, Version,
};

fn make_event(aggregate_id: &str) -> NewEvent {
    NewEvent::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type("Order")
        .event_type("order.created")
        .payload_raw(serde_json::json!({
            "order_id": 1,
            "customer_id": "customer-1",
            "total_cents": 5500
        }))
        .build()
}

fn bench_append_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                store.append(make_event("order-1")).await.unwrap();
            });
        });
    });
}

fn bench_append_100_to_one_aggregate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_100_to_one_aggregate", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                for _ in 0..100 {
                    store.append(make_event("order-1")).await.unwrap();
                }
            });
        });
    });
}

fn bench_read_aggregate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();

    // Pre-populate with 100 events
    rt.block_on(async {
        for _ in 0..100 {
            store.append(make_event("order-1")).await.unwrap();
        }
    });

    c.bench_function("event_store/read_aggregate_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let events = store
                    .read_aggregate(&AggregateId::new("order-1"), "Order", Version::first())
                    .await
                    .unwrap();
                assert_eq!(events.len(), 100);
            });
        });
    });
}

fn bench_read_all_paginated(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();

    rt.block_on(async {
        for i in 0..500 {
            store.append(make_event(&format!("order-{i}"))).await.unwrap();
        }
    });

    c.bench_function("event_store/read_all_page_of_50", |b| {
        b.iter(|| {
            rt.block_on(async {
                let page = store
                    .read_all(&EventFilter::new().page(3).page_size(50))
                    .await
                    .unwrap();
                assert_eq!(page.events.len(), 50);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_event,
    bench_append_100_to_one_aggregate,
    bench_read_aggregate,
    bench_read_all_paginated
);
criterion_main!(benches);
