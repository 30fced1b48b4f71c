use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crossbeam::channel::unbounded;
use stage_chain::transform::{Identity, Uppercaser};
use stage_chain::{BoundedQueue, ChainBuilder, ChannelSink};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn benchmark_queue_handoff(c: &mut Criterion) {
    c.bench_function("queue_handoff_10000_items", |b| {
        b.iter(|| {
            let queue = BoundedQueue::new(64).expect("Queue failed");
            thread::scope(|s| {
                let consumer = s.spawn(|| {
                    let mut count = 0usize;
                    while queue.get().is_some() {
                        count += 1;
                    }
                    count
                });

                for i in 0..10_000u64 {
                    let _ = queue.put(black_box(i));
                }
                queue.signal_finished();
                consumer.join().expect("Consumer panicked")
            })
        });
    });
}

fn benchmark_single_stage_throughput(c: &mut Criterion) {
    c.bench_function("single_stage_1000_records", |b| {
        b.iter(|| {
            let (tx, rx) = unbounded();
            let chain = ChainBuilder::new()
                .queue_capacity(1000)
                .add_stage(Arc::new(Identity))
                .sink(Arc::new(ChannelSink::new(tx)))
                .build()
                .expect("Build failed");

            for i in 0..1000 {
                let _ = chain.feed_line(black_box(&format!("record {i}")));
            }
            let _ = chain.finish();
            let _ = chain.shutdown();
            rx.try_iter().count()
        });
    });
}

fn benchmark_three_stage_throughput(c: &mut Criterion) {
    c.bench_function("three_stage_1000_records", |b| {
        b.iter(|| {
            let (tx, rx) = unbounded();
            let chain = ChainBuilder::new()
                .queue_capacity(64)
                .add_stage(Arc::new(Identity))
                .add_stage(Arc::new(Uppercaser))
                .add_stage(Arc::new(Identity))
                .sink(Arc::new(ChannelSink::new(tx)))
                .build()
                .expect("Build failed");

            for i in 0..1000 {
                let _ = chain.feed_line(black_box(&format!("record {i}")));
            }
            let _ = chain.finish();
            let _ = chain.shutdown();
            rx.try_iter().count()
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_queue_handoff, benchmark_single_stage_throughput, benchmark_three_stage_throughput
);
criterion_main!(benches);
