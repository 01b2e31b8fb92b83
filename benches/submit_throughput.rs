//! Benchmarks for submit-to-drain throughput across pool variants.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use taskwell::{build, Config, PoolKind, Task, WorkerPool};

fn pool_of(kind: PoolKind) -> Box<dyn WorkerPool> {
    let config = Config::builder()
        .kind(kind)
        .num_threads(4)
        .queue_capacity(1 << 20)
        .build()
        .unwrap();
    build(config).unwrap()
}

fn submit_and_drain(pool: &dyn WorkerPool, tasks: usize) -> usize {
    let count = Arc::new(AtomicUsize::new(0));
    for _ in 0..tasks {
        let count = count.clone();
        let accepted = pool.submit(Task::new(move || {
            count.fetch_add(1, Ordering::Relaxed);
        }));
        assert!(accepted);
    }
    assert!(pool.wait_for_completion(Duration::ZERO));
    count.load(Ordering::Relaxed)
}

fn bench_submit_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_throughput");

    for kind in [PoolKind::Bounded, PoolKind::CoreAffine, PoolKind::Unbounded] {
        for tasks in [100usize, 1_000, 10_000] {
            group.bench_with_input(
                BenchmarkId::new(format!("{kind:?}"), tasks),
                &tasks,
                |b, &tasks| {
                    let pool = pool_of(kind);
                    b.iter(|| black_box(submit_and_drain(pool.as_ref(), tasks)));
                },
            );
        }
    }

    group.finish();
}

fn bench_spawn_per_task(c: &mut Criterion) {
    // Thread creation dominates here; bench at smaller sizes.
    let mut group = c.benchmark_group("spawn_per_task");

    for tasks in [10usize, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            let pool = pool_of(PoolKind::SpawnPerTask);
            b.iter(|| black_box(submit_and_drain(pool.as_ref(), tasks)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_submit_throughput, bench_spawn_per_task);
criterion_main!(benches);
