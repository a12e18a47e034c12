// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_queue::UnboundedQueue;
use criterion::{BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use tokio::runtime::Runtime;

/// # Panics
///
/// This benchmark constructs a local `Runtime` with `Runtime::new().unwrap()`, which may panic.
pub fn bench_unbounded_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("unbounded_queue");
    let rt = Runtime::new().unwrap();

    for &size in &[100usize, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bencher, &size| {
            bencher.iter(|| {
                rt.block_on(async {
                    let queue = UnboundedQueue::new();
                    for value in 0..size {
                        queue.push(value);
                    }
                    queue.complete().unwrap();
                    while let Some(value) = queue.wait_for_next().await.unwrap() {
                        black_box(value);
                    }
                });
            });
        });
    }

    group.finish();
}
