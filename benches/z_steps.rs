use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kdpfc::{
    CoordinateAscent, DriverOptions, Entry, KMeansInitializer, LocalSearchSolver, ModelParams,
    Reduction, SolverBudget, TernaryMatrix,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn random_matrix(m: usize, n: usize, seed: u64) -> TernaryMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    TernaryMatrix::from_fn(m, n, |_, _| match rng.random_range(0..10) {
        0 => Entry::Missing,
        1..=4 => Entry::One,
        _ => Entry::Zero,
    })
}

/// Driver after one E-step, so the Z-steps see a non-trivial solution
fn prepared_driver(m: usize, n: usize) -> CoordinateAscent {
    let d = random_matrix(m, n, 42);
    let options = DriverOptions {
        n_taxon_clusters: 10,
        n_character_clusters: 10,
        ..DriverOptions::default()
    };
    let mut driver = CoordinateAscent::from_reduction(
        &Reduction::new(&d),
        ModelParams::new(0.001, 0.3, 1).unwrap(),
        options,
        Box::new(LocalSearchSolver::new()),
        Box::new(KMeansInitializer::default()),
    )
    .unwrap();
    driver.init_z(0).unwrap();
    driver.solve_e(&SolverBudget::default()).unwrap();
    driver
}

/// Benchmark the taxon assignment step over growing matrices
fn bench_z_taxa(c: &mut Criterion) {
    let mut group = c.benchmark_group("z_taxa");

    for size in [50, 200, 800] {
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("cells", size), &size, |b, &size| {
            let mut driver = prepared_driver(size, size);
            b.iter(|| black_box(driver.solve_z_taxa()))
        });
    }

    group.finish();
}

/// Benchmark the character assignment step over growing matrices
fn bench_z_characters(c: &mut Criterion) {
    let mut group = c.benchmark_group("z_characters");

    for size in [50, 200, 800] {
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("cells", size), &size, |b, &size| {
            let mut driver = prepared_driver(size, size);
            b.iter(|| black_box(driver.solve_z_characters()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_z_taxa, bench_z_characters);
criterion_main!(benches);
