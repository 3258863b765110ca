//! Collection Benchmarks
//!
//! Heap loading with deferred ordering against one sift per offer, and
//! skip-list insertion.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trellis_core::collect::{BinaryHeap, Heap, SkipSet};

fn priorities(n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| rng.gen::<f64>()).collect()
}

fn bench_heap_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_load");
    for &n in &[100usize, 1_000, 10_000] {
        let input = priorities(n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("incremental", n), &input, |b, input| {
            b.iter_batched(
                || {
                    let mut heap = BinaryHeap::with_capacity(input.len());
                    heap.defer_ordering(false);
                    heap
                },
                |mut heap| {
                    for (i, &p) in input.iter().enumerate() {
                        heap.offer(i, p).unwrap();
                    }
                    black_box(heap.peek().copied())
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("deferred", n), &input, |b, input| {
            b.iter_batched(
                || BinaryHeap::with_capacity(input.len()),
                |mut heap| {
                    heap.defer_ordering_for_bulk_add(input.len());
                    for (i, &p) in input.iter().enumerate() {
                        heap.offer(i, p).unwrap();
                    }
                    black_box(heap.peek().copied())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_heap_reprioritize(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_change_priority");
    let n = 10_000;
    let input = priorities(n);
    let updates = {
        let mut rng = StdRng::seed_from_u64(7);
        (0..n).map(|_| rng.gen::<f64>()).collect::<Vec<_>>()
    };
    for deferred in [false, true] {
        group.bench_function(BenchmarkId::from_parameter(if deferred { "deferred" } else { "incremental" }), |b| {
            b.iter_batched(
                || {
                    let mut heap = BinaryHeap::with_capacity(n);
                    let entries: Vec<_> = input
                        .iter()
                        .enumerate()
                        .map(|(i, &p)| heap.offer(i, p).unwrap())
                        .collect();
                    heap.peek();
                    (heap, entries)
                },
                |(mut heap, entries)| {
                    if deferred {
                        heap.defer_ordering_for_bulk_change(entries.len());
                    } else {
                        heap.defer_ordering(false);
                    }
                    for (entry, &p) in entries.iter().zip(&updates) {
                        heap.change_priority(entry, p).unwrap();
                    }
                    black_box(heap.peek().copied())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_skip_list_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("skip_list_insert");
    for &n in &[100usize, 1_000, 10_000] {
        let mut rng = StdRng::seed_from_u64(3);
        let keys: Vec<u64> = (0..n).map(|_| rng.gen()).collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &keys, |b, keys| {
            b.iter(|| {
                let mut set = SkipSet::new();
                for &key in keys {
                    set.insert(key);
                }
                black_box(set.len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_heap_load, bench_heap_reprioritize, bench_skip_list_insert);
criterion_main!(benches);
