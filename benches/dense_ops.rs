use criterion::measurement::Measurement;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion};
use dualmat::{Backend, Matrix};
use std::time::Duration;

#[derive(Clone)]
pub struct DenseConfig {
    seed: u64,
    sizes: Vec<usize>,
    measurement_time: u64,
    sample_size: usize,
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            sizes: vec![16, 64, 256],
            measurement_time: 10,
            sample_size: 20,
        }
    }
}

fn configure_group<'a, M: Measurement>(
    c: &'a mut Criterion<M>,
    name: &str,
    config: &DenseConfig,
) -> BenchmarkGroup<'a, M> {
    let mut group = c.benchmark_group(name);
    group.measurement_time(Duration::from_secs(config.measurement_time));
    group.sample_size(config.sample_size);
    group
}

// Symmetric positive definite, so the same input feeds every decomposition.
fn spd_matrix(backend: Backend, n: usize, seed: u64) -> Matrix {
    let r = backend.rand_seeded(n, n, seed);
    let shift = &backend.eye(n) * (n as f64);
    r.matmul(&r.t()).unwrap().add(&shift).unwrap()
}

pub fn bench_matmul(c: &mut Criterion) {
    let config = DenseConfig::default();
    let mut group = configure_group(c, "Dense_Matmul", &config);

    for backend in Backend::ALL {
        for &n in config.sizes.iter() {
            let a = backend.rand_seeded(n, n, config.seed);
            let b = backend.rand_seeded(n, n, config.seed + 1);

            group.bench_with_input(
                BenchmarkId::new(backend.to_string(), format!("{}x{}", n, n)),
                &n,
                |bench, _| {
                    bench.iter(|| a.matmul(&b).unwrap());
                },
            );
        }
    }
    group.finish();
}

pub fn bench_decompositions(c: &mut Criterion) {
    let config = DenseConfig::default();
    let mut group = configure_group(c, "Dense_Decompositions", &config);

    for backend in Backend::ALL {
        for &n in config.sizes.iter() {
            let a = spd_matrix(backend, n, config.seed);

            group.bench_with_input(
                BenchmarkId::new(
                    format!("{}_lu", backend),
                    format!("{}x{}", n, n),
                ),
                &n,
                |bench, _| {
                    bench.iter(|| a.lu().unwrap());
                },
            );
            group.bench_with_input(
                BenchmarkId::new(
                    format!("{}_qr", backend),
                    format!("{}x{}", n, n),
                ),
                &n,
                |bench, _| {
                    bench.iter(|| a.qr().unwrap());
                },
            );
            group.bench_with_input(
                BenchmarkId::new(
                    format!("{}_chol", backend),
                    format!("{}x{}", n, n),
                ),
                &n,
                |bench, _| {
                    bench.iter(|| a.chol().unwrap());
                },
            );
        }
    }
    group.finish();
}

pub fn bench_solve(c: &mut Criterion) {
    let config = DenseConfig::default();
    let mut group = configure_group(c, "Dense_Solve", &config);

    for backend in Backend::ALL {
        for &n in config.sizes.iter() {
            let a = spd_matrix(backend, n, config.seed);
            let b = backend.rand_seeded(n, 1, config.seed + 2);

            group.bench_with_input(
                BenchmarkId::new(backend.to_string(), format!("{}x{}", n, n)),
                &n,
                |bench, _| {
                    bench.iter(|| a.solve(&b).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(dense_benches, bench_matmul, bench_decompositions, bench_solve);
criterion_main!(dense_benches);
