//! Benchmarks for clconv operations.
//!
//! Run with: `cargo bench -p clconv-bench`

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use clconv_bench::{pattern, IDENTITY_SOURCE, SOBEL_SOURCE};
use clconv_compute::{compute_work_size, CpuBackend, Orchestrator, RunConfig};
use clconv_core::pixel;

/// 8-bit <-> normalized float conversion.
fn bench_pixel(c: &mut Criterion) {
    let mut group = c.benchmark_group("pixel");

    for size in [1 << 12, 1 << 16, 1 << 20].iter() {
        let bytes: Vec<u8> = (0..*size).map(|i| (i % 256) as u8).collect();
        let floats = pixel::normalize_slice(&bytes);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("normalize", size), &bytes, |b, v| {
            b.iter(|| pixel::normalize_slice(black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("denormalize", size), &floats, |b, v| {
            b.iter(|| pixel::denormalize_slice(black_box(v)))
        });
    }

    group.finish();
}

/// Work-size arithmetic.
fn bench_tiling(c: &mut Criterion) {
    c.bench_function("compute_work_size", |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for w in 1..512u32 {
                acc += compute_work_size(black_box(w), black_box(w / 2 + 1)).global[0];
            }
            acc
        })
    });
}

/// Full in-memory pipeline on the host runtime.
fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");
    group.sample_size(20);
    let api = CpuBackend::new();

    for (entry, source) in [("identity", IDENTITY_SOURCE), ("sobel", SOBEL_SOURCE)] {
        let config = RunConfig {
            entry: entry.into(),
            ..RunConfig::default()
        };
        let orchestrator = Orchestrator::from_config(&api, config);

        for size in [64u32, 256, 1024].iter() {
            let image = pattern(*size, *size).unwrap();
            group.throughput(Throughput::Elements((*size * *size) as u64));
            group.bench_with_input(BenchmarkId::new(entry, size), &image, |b, img| {
                b.iter(|| orchestrator.process(black_box(img), source))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_pixel, bench_tiling, bench_process);
criterion_main!(benches);
