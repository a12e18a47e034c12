// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod priority_merge_bench;
mod unbounded_queue_bench;

use criterion::{criterion_group, criterion_main};
use priority_merge_bench::{bench_priority_merge_pull, bench_priority_merge_push};
use unbounded_queue_bench::bench_unbounded_queue;

criterion_group!(
    merge_benches,
    bench_priority_merge_pull,
    bench_priority_merge_push,
    bench_unbounded_queue
);
criterion_main!(merge_benches);
