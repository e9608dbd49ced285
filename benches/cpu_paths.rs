//! Benchmarks for the CPU-side work done at start-up and on reset.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use particle_bloom::spawn::quad_indices;
use particle_bloom::{Fragments, NoiseVolume, ParticleSnapshot, ShaderSources};

fn bench_layouts(c: &mut Criterion) {
    let mut group = c.benchmark_group("layouts");

    for count in [1u32 << 14, 1 << 17, 1 << 20] {
        group.bench_with_input(BenchmarkId::new("quad_indices", count), &count, |b, &n| {
            b.iter(|| black_box(quad_indices(n)))
        });

        group.bench_with_input(BenchmarkId::new("heart", count), &count, |b, &n| {
            b.iter(|| black_box(ParticleSnapshot::heart(n, 0.3)))
        });

        group.bench_with_input(BenchmarkId::new("uniform", count), &count, |b, &n| {
            let mut rng = SmallRng::seed_from_u64(0);
            b.iter(|| black_box(ParticleSnapshot::uniform(n, 0.5, &mut rng)))
        });
    }

    group.finish();
}

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise");

    for size in [16u32, 32, 64] {
        group.bench_with_input(BenchmarkId::new("generate", size), &size, |b, &size| {
            let mut rng = SmallRng::seed_from_u64(0);
            b.iter(|| black_box(NoiseVolume::generate(size, &mut rng)))
        });
    }

    group.finish();
}

fn bench_shaders(c: &mut Criterion) {
    let sources = ShaderSources::embedded();
    let fragments = Fragments::standard();

    c.bench_function("prepare_shaders", |b| {
        b.iter(|| black_box(sources.prepare(&fragments)))
    });
}

criterion_group!(benches, bench_layouts, bench_noise, bench_shaders);
criterion_main!(benches);
