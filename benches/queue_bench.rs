//! Benchmarks for the queue primitives and the parallel map.
//!
//! Benchmarks cover:
//! - ClosableQueue push/pop on one thread (lock overhead)
//! - ClosableQueue producer/consumer hand-off across threads
//! - PopQueue claiming from several threads
//! - End-to-end parallel map

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use prometheus_task_core::core::{worker_pool, ClosableQueue, PopQueue};

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_pop");

    for size in [100_u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let q = ClosableQueue::new();
                for i in 0..size {
                    q.push(i);
                }
                q.close();
                for item in &q {
                    black_box(item);
                }
            });
        });
    }
    group.finish();
}

fn bench_queue_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_handoff");

    for capacity in [1_usize, 64, 1_024] {
        let items = 10_000_u64;
        group.throughput(Throughput::Elements(items));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let q = Arc::new(ClosableQueue::bounded(capacity));
                    let producer = {
                        let q = Arc::clone(&q);
                        thread::spawn(move || {
                            for i in 0..items {
                                q.push(i);
                            }
                            q.close();
                        })
                    };
                    let sum: u64 = q.iter().sum();
                    producer.join().unwrap();
                    black_box(sum);
                });
            },
        );
    }
    group.finish();
}

fn bench_pop_queue_claims(c: &mut Criterion) {
    let mut group = c.benchmark_group("pop_queue_claims");

    for threads in [1_usize, 4, 8] {
        let items = 10_000_usize;
        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let q: Arc<PopQueue<usize>> = Arc::new((0..items).collect());
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let q = Arc::clone(&q);
                        thread::spawn(move || q.iter().count())
                    })
                    .collect();
                let claimed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
                black_box(claimed);
            });
        });
    }
    group.finish();
}

// ============================================================================
// Parallel Map Benchmarks
// ============================================================================

fn bench_parallel_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_map");

    for workers in [1_usize, 2, 4] {
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let total: u64 = worker_pool::go(0..1_000_u64, workers, |x| {
                    (0..100).fold(x, |acc, i| acc.wrapping_mul(31).wrapping_add(i))
                })
                .unwrap()
                .fold(0, u64::wrapping_add);
                black_box(total);
            });
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(
    queue_benches,
    bench_queue_push_pop,
    bench_queue_handoff,
    bench_pop_queue_claims
);

criterion_group!(map_benches, bench_parallel_map);

criterion_main!(queue_benches, map_benches);
