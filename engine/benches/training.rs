// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use config::{BprConfig, LatentFactorsConfig, RatingsConfig};
use controller::{Ratings, SparseBooleanMatrix};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::{
    correlation::{CorrelationMatrix, Method},
    factors::{biased::BiasedMatrixFactorization, bpr::BprMf},
    IterativeModel, Recommender,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn generate_ratings(num_users: usize, num_items: usize, density: f64) -> Ratings {
    let mut rng = StdRng::seed_from_u64(2020);
    let mut events = Vec::new();

    for u in 0..num_users {
        for i in 0..num_items {
            if rng.gen_bool(density) {
                events.push((u, i, rng.gen_range(1, 6) as f64));
            }
        }
    }

    events.into_iter().collect()
}

fn cosine_correlation_500(c: &mut Criterion) {
    let matrix: SparseBooleanMatrix = generate_ratings(500, 200, 0.05).user_items();

    c.bench_function("cosine correlation 500 users", |bench| {
        bench.iter(|| CorrelationMatrix::create(black_box(&matrix), Method::Cosine))
    });
}

fn jaccard_correlation_500(c: &mut Criterion) {
    let matrix: SparseBooleanMatrix = generate_ratings(500, 200, 0.05).user_items();

    c.bench_function("jaccard correlation 500 users", |bench| {
        bench.iter(|| CorrelationMatrix::create(black_box(&matrix), Method::Jaccard))
    });
}

fn biased_mf_iteration(c: &mut Criterion) {
    let ratings = generate_ratings(1000, 500, 0.02);
    let mut rng = StdRng::seed_from_u64(0);

    let params = LatentFactorsConfig {
        num_iter: 1,
        ..LatentFactorsConfig::default()
    };

    let mut mf = BiasedMatrixFactorization::new(&params, &RatingsConfig::default(), ratings)
        .expect("valid rating range");
    mf.train(&mut rng).expect("trainable ratings");

    c.bench_function("biased mf iteration", |bench| {
        bench.iter(|| mf.iterate(&mut rng))
    });
}

fn bpr_mf_iteration(c: &mut Criterion) {
    let data = generate_ratings(1000, 500, 0.02).user_items();
    let mut rng = StdRng::seed_from_u64(0);

    let params = BprConfig {
        num_iter: 1,
        ..BprConfig::default()
    };

    let mut bpr = BprMf::new(&params, data);
    bpr.train(&mut rng).expect("trainable feedback");

    c.bench_function("bpr mf iteration", |bench| {
        bench.iter(|| bpr.iterate(&mut rng))
    });
}

criterion_group!(
    benches,
    cosine_correlation_500,
    jaccard_correlation_500,
    biased_mf_iteration,
    bpr_mf_iteration
);
criterion_main!(benches);
