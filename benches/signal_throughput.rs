//! Fan-out cost of `Signal::emit` under each caller policy.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use sigflow::signal::{AsyncPolicy, Queue, Signal, SyncPolicy};
use sigflow::threadpool::WorkerPool;

fn bench_emit_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_emit_sync");
    for fan_out in [1usize, 4, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(fan_out), &fan_out, |b, &fan_out| {
            let signal: Signal<u64, u64, SyncPolicy, Queue<u64>> = Signal::new(SyncPolicy);
            for _ in 0..fan_out {
                signal.connect(|x| x.wrapping_mul(2));
            }
            b.iter(|| {
                signal.emit(42);
                signal.results(true, true)
            });
        });
    }
    group.finish();
}

fn bench_emit_async(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_emit_async");
    for fan_out in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(fan_out), &fan_out, |b, &fan_out| {
            let signal: Signal<u64, u64, AsyncPolicy, Queue<u64>> = Signal::new(AsyncPolicy);
            for _ in 0..fan_out {
                signal.connect(|x| x.wrapping_mul(2));
            }
            b.iter(|| {
                signal.emit(42);
                signal.results(true, true)
            });
        });
    }
    group.finish();
}

fn bench_worker_pool_submit(c: &mut Criterion) {
    let pool = Arc::new(WorkerPool::new(4));
    c.bench_function("worker_pool_submit_1k", |b| {
        b.iter(|| {
            let (tx, rx) = crossbeam_channel::bounded::<()>(1024);
            for _ in 0..1024 {
                let tx = tx.clone();
                pool.submit(move || {
                    let _ = tx.send(());
                });
            }
            for _ in 0..1024 {
                rx.recv().unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_emit_sync, bench_emit_async, bench_worker_pool_submit);
criterion_main!(benches);
