// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_merge::{PriorityMerge, PushHandle, Source};
use criterion::{BenchmarkId, Criterion, Throughput};
use futures::stream::{self, StreamExt};
use std::hint::black_box;
use tokio::runtime::Runtime;

fn pull_sources(size: usize, num_sources: usize) -> Vec<Source<Vec<u8>>> {
    (0..num_sources)
        .map(|_| Source::values(stream::iter((0..size).map(|_| vec![0u8; 32]))))
        .collect()
}

fn push_sources(size: usize, num_sources: usize) -> Vec<Source<Vec<u8>>> {
    (0..num_sources)
        .map(|_| {
            Source::push(move |handle: PushHandle<Vec<u8>>| {
                for _ in 0..size {
                    handle.push(vec![0u8; 32]);
                }
                handle.stop();
            })
        })
        .collect()
}

fn drain(rt: &Runtime, sources: impl FnOnce() -> Vec<Source<Vec<u8>>>) {
    rt.block_on(async move {
        let mut merged = PriorityMerge::new(sources()).unwrap();
        while let Some(item) = merged.next().await {
            black_box(item);
        }
    });
}

/// # Panics
///
/// This benchmark constructs a local `Runtime` with `Runtime::new().unwrap()`, which may panic.
pub fn bench_priority_merge_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_merge_pull");
    let rt = Runtime::new().unwrap();

    for &size in &[100usize, 1000, 10000] {
        for &num_sources in &[2usize, 5, 10] {
            let id = BenchmarkId::from_parameter(format!("m{size}_s{num_sources}"));
            group.throughput(Throughput::Elements((size * num_sources) as u64));
            group.bench_with_input(id, &(size, num_sources), |bencher, &(size, num_sources)| {
                bencher.iter(|| drain(&rt, || pull_sources(size, num_sources)));
            });
        }
    }

    group.finish();
}

/// # Panics
///
/// This benchmark constructs a local `Runtime` with `Runtime::new().unwrap()`, which may panic.
pub fn bench_priority_merge_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_merge_push");
    let rt = Runtime::new().unwrap();

    for &size in &[100usize, 1000, 10000] {
        for &num_sources in &[2usize, 5] {
            let id = BenchmarkId::from_parameter(format!("m{size}_s{num_sources}"));
            group.throughput(Throughput::Elements((size * num_sources) as u64));
            group.bench_with_input(id, &(size, num_sources), |bencher, &(size, num_sources)| {
                bencher.iter(|| drain(&rt, || push_sources(size, num_sources)));
            });
        }
    }

    group.finish();
}
