//! Criterion benchmarks for the nearest-neighbor searches and the aggregation step.
//!
//! Uses a synthetic water box: oxygens on a jittered cubic lattice at roughly
//! liquid density (33 molecules/nm^3).
//!
//! Run with: cargo bench -p wpt-packing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wpt_core::pbc::PeriodicBox;
use wpt_packing::{
    BruteForceSearch, DistanceCollection, HistogramMode, NeighborSearch, PeriodicCutoffSearch,
};

/// Oxygen positions for `n_side^3` waters plus the matching cubic box.
fn synthetic_water_box(n_side: usize) -> (Vec<[f64; 3]>, PeriodicBox) {
    let spacing = 0.31;
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut jitter = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 0.08
    };
    let mut positions = Vec::with_capacity(n_side * n_side * n_side);
    for i in 0..n_side {
        for j in 0..n_side {
            for k in 0..n_side {
                positions.push([
                    i as f64 * spacing + jitter(),
                    j as f64 * spacing + jitter(),
                    k as f64 * spacing + jitter(),
                ]);
            }
        }
    }
    let pbox = PeriodicBox::cubic(n_side as f64 * spacing).expect("positive box");
    (positions, pbox)
}

fn bench_searches(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_distances");
    for &n_side in &[6usize, 10, 14] {
        let (positions, pbox) = synthetic_water_box(n_side);
        let label = format!("{}waters", positions.len());
        let periodic = PeriodicCutoffSearch::new(0.5).expect("valid cutoff");

        group.bench_with_input(
            BenchmarkId::new("brute_force", &label),
            &positions,
            |b, positions| {
                b.iter(|| BruteForceSearch.nearest_distances(black_box(positions), None));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("periodic_cell_list", &label),
            &(&positions, &pbox),
            |b, &(positions, pbox)| {
                b.iter(|| periodic.nearest_distances(black_box(positions), Some(pbox)));
            },
        );
    }
    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let (positions, pbox) = synthetic_water_box(14);
    let distances = PeriodicCutoffSearch::new(0.5)
        .and_then(|s| s.nearest_distances(&positions, Some(&pbox)))
        .expect("synthetic box has neighbors");
    let mut collection = DistanceCollection::new();
    for _ in 0..100 {
        collection.record(&distances);
    }

    let mut group = c.benchmark_group("aggregation");
    group.bench_function("statistics", |b| {
        b.iter(|| black_box(&collection).statistics())
    });
    group.bench_function("density_histogram_50", |b| {
        b.iter(|| black_box(&collection).density_histogram(50, None, HistogramMode::Density))
    });
    group.finish();
}

criterion_group!(benches, bench_searches, bench_aggregation);
criterion_main!(benches);
