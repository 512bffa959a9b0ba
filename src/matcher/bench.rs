#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use matcher::recursive_match;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_matrix(size: usize) -> Array2<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    Array2::from_shape_simple_fn((size, size), || rng.random::<f32>())
}

// Overlap matrices from detectors are mostly zeros.
fn sparse_matrix(size: usize) -> Array2<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    Array2::from_shape_simple_fn((size, size), || {
        if rng.random_bool(0.05) {
            rng.random::<f32>()
        } else {
            0.0
        }
    })
}

pub fn match_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_dense");
    for size in [10, 100, 500] {
        let m = random_matrix(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &m, |b, m| {
            b.iter(|| recursive_match(m.view(), 0, true).unwrap());
        });
    }
    group.finish();
}

pub fn match_sparse(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_sparse");
    for size in [10, 100, 500] {
        let m = sparse_matrix(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &m, |b, m| {
            b.iter(|| recursive_match(m.view(), 1, true).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, match_dense, match_sparse);
criterion_main!(benches);
