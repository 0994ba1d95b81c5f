//! Benchmark for eventOut dispatch and eventIn coalescing.
//!
//! Run with: cargo bench --package eai_events --bench dispatch_benchmark

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eai_core::{AccessType, FieldElement, FieldId, FieldValue, MemoryNode, NodeHandle};
use eai_events::{
    DispatchConfig, EventAdapterFactory, EventIn, EventOutListener, ExternalEventQueue,
    ManualClock, OutputEvent,
};

fn coordinate_node(points: usize) -> NodeHandle {
    MemoryNode::builder("Coordinate")
        .field(
            "point",
            AccessType::ExposedField,
            FieldValue::MfVec3f(vec![[0.0; 3]; points]),
        )
        .build()
}

fn counting_listener(counter: &Arc<AtomicU64>) -> Arc<dyn EventOutListener> {
    let counter = Arc::clone(counter);
    Arc::new(move |event: &OutputEvent| {
        black_box(event.buffer().size().ok());
        counter.fetch_add(1, Ordering::Relaxed);
    })
}

fn benchmark_synchronous_broadcast(c: &mut Criterion) {
    let node = coordinate_node(256);
    let factory =
        EventAdapterFactory::new(DispatchConfig::synchronous(), Arc::new(ManualClock::new(0.0)))
            .unwrap();
    let counter = Arc::new(AtomicU64::new(0));
    let adapter = factory.get_adapter(&node);
    for _ in 0..4 {
        adapter
            .add_listener(FieldId(0), counting_listener(&counter))
            .unwrap();
    }

    c.bench_function("synchronous_broadcast_4_listeners", |b| {
        b.iter(|| adapter.generate_broadcast(black_box(FieldId(0)), 0.0));
    });
}

fn benchmark_buffered_broadcast(c: &mut Criterion) {
    let node = coordinate_node(256);
    let factory =
        EventAdapterFactory::new(DispatchConfig::default(), Arc::new(ManualClock::new(0.0)))
            .unwrap();
    let counter = Arc::new(AtomicU64::new(0));
    let adapter = factory.get_adapter(&node);
    for _ in 0..4 {
        adapter
            .add_listener(FieldId(0), counting_listener(&counter))
            .unwrap();
    }

    c.bench_function("buffered_broadcast_4_listeners_256_points", |b| {
        b.iter(|| adapter.generate_broadcast(black_box(FieldId(0)), 0.0));
    });

    factory.shutdown();
}

fn benchmark_set1_coalescing(c: &mut Criterion) {
    let node = coordinate_node(1024);
    let queue = Arc::new(ExternalEventQueue::new());
    let input = EventIn::new(node, FieldId(0), Arc::clone(&queue)).unwrap();

    c.bench_function("set1_value_run_of_64", |b| {
        b.iter(|| {
            for i in 0..64 {
                input
                    .set1_value(i, FieldElement::Vec3f([1.0, 2.0, 3.0]))
                    .unwrap();
            }
            black_box(queue.drain())
        });
    });
}

criterion_group!(
    benches,
    benchmark_synchronous_broadcast,
    benchmark_buffered_broadcast,
    benchmark_set1_coalescing,
);
criterion_main!(benches);
