//! World tick benchmarks for spacedef_core.
//!
//! Run with: `cargo bench -p spacedef_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use spacedef_core::power;
use spacedef_test_utils::fixtures::{siege_world, skirmish_world, FRAME_DT};

/// One tick of the siege level, measured after the first waves have landed.
pub fn siege_tick_benchmark(c: &mut Criterion) {
    let mut world = siege_world(7);
    for _ in 0..(5 * 60) {
        world.tick(FRAME_DT);
    }

    c.bench_function("siege_tick", |b| {
        b.iter_batched(
            || world.clone(),
            |mut world| black_box(world.tick(FRAME_DT)),
            BatchSize::SmallInput,
        );
    });
}

/// Open-space dogfights of growing size.
pub fn skirmish_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("skirmish_60_ticks");
    for size in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || skirmish_world(3, size, size).0,
                |mut world| {
                    for _ in 0..60 {
                        black_box(world.tick(FRAME_DT));
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Power distribution over the siege base.
pub fn power_benchmark(c: &mut Criterion) {
    let world = siege_world(7);
    c.bench_function("power_distribute", |b| {
        b.iter_batched(
            || world.buildings().clone(),
            |mut buildings| black_box(power::distribute(&mut buildings)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, siege_tick_benchmark, skirmish_benchmark, power_benchmark);
criterion_main!(benches);
