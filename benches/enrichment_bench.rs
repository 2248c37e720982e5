use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use spotgraph::builder::SpatialNeighborsBuilder;
use spotgraph::enrichment::NhoodEnrichmentBuilder;
use spotgraph::graph::CoordType;
use spotgraph::labels::LabelAssignment;
use spotgraph::points::PointSet;
use std::hint::black_box;
use std::time::Duration;

/// Offset-row hexagonal lattice with unit spacing
fn hex_lattice(rows: usize, cols: usize) -> PointSet {
    let h = 3f64.sqrt() / 2.0;
    let coords = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| [c as f64 + 0.5 * (r % 2) as f64, r as f64 * h]))
        .collect();
    PointSet::new(coords).unwrap()
}

/// Uniform points in a square of side `n.sqrt()` (about one point per unit area)
fn random_points(n: usize, seed: u64) -> PointSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let side = (n as f64).sqrt();
    let coords = (0..n)
        .map(|_| [rng.random_range(0.0..side), rng.random_range(0.0..side)])
        .collect();
    PointSet::new(coords).unwrap()
}

fn random_labels(n: usize, n_clusters: u32, seed: u64) -> LabelAssignment<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let raw: Vec<u32> = (0..n).map(|_| rng.random_range(0..n_clusters)).collect();
    LabelAssignment::new(&raw).unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group_build = c.benchmark_group("build_spatial_graph");
    group_build.warm_up_time(Duration::from_millis(500));
    group_build.measurement_time(Duration::from_secs(3));
    group_build.sample_size(20);

    for &k in &[4, 6, 10] {
        let points = random_points(2_000, 42);
        group_build.bench_function(BenchmarkId::new("generic_knn", k), |b| {
            b.iter(|| {
                let graph = SpatialNeighborsBuilder::new()
                    .with_n_neigh(k)
                    .build(&points)
                    .unwrap();
                black_box(graph);
            })
        });
    }

    for &radius in &[1.0, 2.0] {
        let points = random_points(2_000, 42);
        group_build.bench_function(BenchmarkId::new("generic_radius", radius), |b| {
            b.iter(|| {
                let graph = SpatialNeighborsBuilder::new()
                    .with_radius(Some(radius))
                    .build(&points)
                    .unwrap();
                black_box(graph);
            })
        });
    }

    for &n_rings in &[1, 2, 3] {
        let points = hex_lattice(40, 50);
        group_build.bench_function(BenchmarkId::new("grid_rings", n_rings), |b| {
            b.iter(|| {
                let graph = SpatialNeighborsBuilder::new()
                    .with_coord_type(CoordType::Grid)
                    .with_n_rings(n_rings)
                    .build(&points)
                    .unwrap();
                black_box(graph);
            })
        });
    }
    group_build.finish();

    let mut group_enrich = c.benchmark_group("nhood_enrichment");
    group_enrich.warm_up_time(Duration::from_millis(500));
    group_enrich.measurement_time(Duration::from_secs(5));
    group_enrich.sample_size(10);

    let points = hex_lattice(40, 50);
    let graph = SpatialNeighborsBuilder::new()
        .with_coord_type(CoordType::Grid)
        .build(&points)
        .unwrap();

    for &n_clusters in &[5, 20] {
        for &n_perms in &[100, 500] {
            let id = format!("clusters_{}_perms", n_clusters);
            group_enrich.bench_function(BenchmarkId::new(id, n_perms), |b| {
                b.iter_batched(
                    || random_labels(points.len(), n_clusters, 7),
                    |labels| {
                        let report = NhoodEnrichmentBuilder::new()
                            .with_permutations(n_perms)
                            .with_seed(7)
                            .run(&graph, &labels)
                            .unwrap();
                        black_box(report);
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group_enrich.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
