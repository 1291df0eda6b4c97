//! Defect detection and repair benchmarks.
//! Run with: cargo bench -p rawrestore --bench defects

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rawrestore::{
    Buffer2, CfaPattern, CfaType, DefectConfig, DefectMap, RawFrame, XTransPattern,
    correct_defects, find_hot_dead_pixels, interpolate_bayer, interpolate_xtrans,
};

const SIZES: [usize; 2] = [512, 2048];

const XTRANS_TILE: [[u8; 6]; 6] = [
    [1, 1, 0, 1, 1, 2],
    [1, 1, 2, 1, 1, 0],
    [2, 0, 1, 0, 2, 1],
    [1, 1, 2, 1, 1, 0],
    [1, 1, 0, 1, 1, 2],
    [0, 2, 1, 2, 0, 1],
];

/// Noisy grid with a hot site every 97 samples.
fn synthetic_grid(width: usize, height: usize) -> Buffer2<f32> {
    let mut state = 0x9e37_79b9_u32;
    let pixels = (0..width * height)
        .map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (state >> 16) as f32 / 65536.0 * 200.0;
            if i % 97 == 0 { 60000.0 } else { 1000.0 + noise }
        })
        .collect();
    Buffer2::new(width, height, pixels)
}

fn sparse_map(width: usize, height: usize) -> DefectMap {
    let mut map = DefectMap::new(width, height);
    for y in (2..height - 2).step_by(7) {
        for x in (2..width - 2).step_by(11) {
            map.set(x, y);
        }
    }
    map
}

fn benchmark_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("hot_dead_detection");
    for size in SIZES {
        let grid = synthetic_grid(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                let mut map = DefectMap::new(size, size);
                let found = find_hot_dead_pixels(black_box(&grid), &mut map, 100.0, true, true);
                black_box(found)
            })
        });
    }
    group.finish();
}

fn benchmark_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation");
    let xtrans = XTransPattern::new(XTRANS_TILE);
    for size in SIZES {
        let grid = synthetic_grid(size, size);
        let map = sparse_map(size, size);
        group.throughput(Throughput::Elements(map.count() as u64));

        group.bench_function(BenchmarkId::new("bayer", size), |b| {
            b.iter_batched_ref(
                || grid.clone(),
                |grid| black_box(interpolate_bayer(&map, grid, CfaPattern::Rggb)),
                criterion::BatchSize::LargeInput,
            )
        });

        group.bench_function(BenchmarkId::new("xtrans", size), |b| {
            b.iter_batched_ref(
                || grid.clone(),
                |grid| black_box(interpolate_xtrans(&map, grid, &xtrans)),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("correct_defects");
    group.sample_size(20);
    let config = DefectConfig {
        zero_is_bad: true,
        hot_pixel_filter: true,
        dead_pixel_filter: true,
        ..DefectConfig::default()
    };
    for size in SIZES {
        let grid = synthetic_grid(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_function(BenchmarkId::new("bayer", size), |b| {
            b.iter_batched_ref(
                || RawFrame::new(grid.clone(), CfaType::Bayer(CfaPattern::Rggb)),
                |frame| black_box(correct_defects(frame, &config)),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_detection,
    benchmark_interpolation,
    benchmark_pipeline
);
criterion_main!(benches);
