// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![expect(missing_docs, reason = "Benchmark code")]

//! Benchmark to assess the performance of the clock. The scenarios:
//! * Schedule 100 one-shot timers spread across 100 minutes and advance in 10 steps
//! * Advance a repeating one-second timer across a full day in a single jump

use std::hint::black_box;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use criterion::{Criterion, criterion_group, criterion_main};
use timewarp::{Clock, Timer};

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("clock_operations");

    group.bench_function("one_shot_timers", |b| {
        b.iter(|| one_shot_timers(black_box(start())));
    });

    group.bench_function("repeating_day_jump", |b| {
        b.iter(|| repeating_day_jump(black_box(start())));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = criterion_benchmark
}

criterion_main!(benches);

fn start() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_707_645_600)
}

#[expect(clippy::arithmetic_side_effects, reason = "reduces clarity")]
fn one_shot_timers(now: SystemTime) -> usize {
    let mut clock = Clock::new();

    for n in 0..100 {
        _ = clock.schedule(now, Timer::once(Duration::from_secs(n * 60))).unwrap();
    }

    (1..=10)
        .map(|step| clock.advance(now + Duration::from_secs(step * 600)).elapsed.len())
        .sum()
}

#[expect(clippy::arithmetic_side_effects, reason = "reduces clarity")]
fn repeating_day_jump(now: SystemTime) -> usize {
    let mut clock = Clock::new();
    _ = clock
        .schedule(now, Timer::repeating(Duration::from_secs(1)).unwrap())
        .unwrap();

    clock.advance(now + Duration::from_secs(86_400)).elapsed.len()
}
