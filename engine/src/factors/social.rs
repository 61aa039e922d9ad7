// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::{
    biased::BiasedMatrixFactorization, sigmoid, LearningMode, FIRST_REGULARIZED_DIMENSION,
    ITEM_EXCLUDED_DIMENSION, USER_EXCLUDED_DIMENSION,
};
use crate::{error::ErrorKind, matrix::Matrix, IterativeModel, Recommender, Result};
use config::{LatentFactorsConfig, RatingsConfig, SocialConfig};
use controller::{Ratings, SparseBooleanMatrix};
use rand::RngCore;
use std::fmt;

/// Mean bias and mean factors of a user's direct neighbors
#[derive(Debug, Clone, PartialEq)]
struct NeighborMean {
    bias: f64,
    factors: Vec<f64>,
}

/// Descent direction contributed by the trust network to one user
#[derive(Debug, Clone, PartialEq)]
pub struct SocialTerm {
    pub bias: f64,
    pub factors: Vec<f64>,
}

impl SocialTerm {
    fn zero(num_factors: usize) -> Self {
        Self {
            bias: 0.0,
            factors: vec![0.0; num_factors],
        }
    }
}

/// Matrix factorization regularized by a binary, symmetric trust network.
///
/// Every iteration is one full-batch gradient step. The error gradient
/// skips user dimension `USER_EXCLUDED_DIMENSION` and item dimension
/// `ITEM_EXCLUDED_DIMENSION`, L2 and the update step only cover dimensions
/// from `FIRST_REGULARIZED_DIMENSION` upwards, and biases receive no error
/// gradient at all.
pub struct SocialMf {
    base: BiasedMatrixFactorization,
    social_regularization: f64,
    user_relation: SparseBooleanMatrix,
}

impl SocialMf {
    pub fn new(
        params: &LatentFactorsConfig,
        social: &SocialConfig,
        range: &RatingsConfig,
        ratings: Ratings,
        user_relation: SparseBooleanMatrix,
    ) -> Result<Self> {
        let mut base = BiasedMatrixFactorization::new(params, range, ratings)?;
        base.set_num_users(user_relation.number_of_rows());
        base.set_num_users(user_relation.number_of_columns());

        Ok(Self {
            base,
            social_regularization: social.social_regularization,
            user_relation,
        })
    }

    pub fn learning_mode(&self) -> LearningMode {
        LearningMode::Batch
    }

    pub fn base(&self) -> &BiasedMatrixFactorization {
        &self.base
    }

    pub fn user_relation(&self) -> &SparseBooleanMatrix {
        &self.user_relation
    }

    pub fn set_num_users(&mut self, num_users: usize) {
        self.base.set_num_users(num_users);
    }

    pub fn set_num_items(&mut self, num_items: usize) {
        self.base.set_num_items(num_items);
    }

    pub(crate) fn init_model(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        self.base.init_model(rng)
    }

    fn neighbor_means(&self) -> Vec<Option<NeighborMean>> {
        let model = &self.base.model;
        let num_factors = model.num_factors();

        (0..model.num_users())
            .map(|u| {
                let num_neighbors = self.user_relation.row_len(u);
                if num_neighbors == 0 {
                    return None;
                }

                let mut mean = NeighborMean {
                    bias: 0.0,
                    factors: vec![0.0; num_factors],
                };

                for v in self.user_relation.row_iter(u) {
                    mean.bias += model.user_bias[v];
                    for (f, value) in model.user_factors.row(v).iter().enumerate() {
                        mean.factors[f] += value;
                    }
                }

                let n = num_neighbors as f64;
                mean.bias /= n;
                mean.factors.iter_mut().for_each(|value| *value /= n);
                Some(mean)
            })
            .collect()
    }

    fn social_term_with(&self, user_id: usize, means: &[Option<NeighborMean>]) -> SocialTerm {
        let model = &self.base.model;
        let num_factors = model.num_factors();

        let own = match means.get(user_id) {
            Some(Some(mean)) => mean,
            _ => return SocialTerm::zero(num_factors),
        };

        let social = self.social_regularization;
        let num_neighbors = self.user_relation.row_len(user_id) as f64;

        // Pull towards the mean of the direct neighbors
        let mut term = SocialTerm {
            bias: -social * (model.user_bias[user_id] - own.bias),
            factors: (0..num_factors)
                .map(|f| -social * (model.user_factors.get(user_id, f) - own.factors[f]))
                .collect(),
        };

        // Second hop, every neighbor weighted by its own trust
        for v in self.user_relation.row_iter(user_id) {
            let theirs = match means.get(v) {
                Some(Some(mean)) => mean,
                _ => continue,
            };

            let trust_v = 1.0 / self.user_relation.row_len(v) as f64;
            let weight = social * trust_v / num_neighbors;

            term.bias += weight * (model.user_bias[v] - theirs.bias);
            for f in 0..num_factors {
                term.factors[f] += weight * (model.user_factors.get(v, f) - theirs.factors[f]);
            }
        }

        term
    }

    /// Trust network contribution to `user_id`'s descent direction, zero for
    /// users without neighbors
    pub fn social_term(&self, user_id: usize) -> SocialTerm {
        let means = self.neighbor_means();
        self.social_term_with(user_id, &means)
    }

    /// One full-batch gradient step over every training rating
    pub fn iterate_batch(&mut self) {
        let model = &self.base.model;
        let num_factors = model.num_factors();
        let num_users = model.num_users();
        let num_items = model.num_items();
        let regularization = self.base.params.regularization;
        let learn_rate = self.base.params.learn_rate;
        let range = model.rating_range();

        let mut user_factors_gradient = Matrix::new(num_users, num_factors);
        let mut item_factors_gradient = Matrix::new(num_items, num_factors);
        let mut user_bias_gradient = vec![0.0; num_users];
        let mut item_bias_gradient = vec![0.0; num_items];

        // Prediction error
        for event in self.base.ratings.all() {
            let (u, i) = (event.user_id, event.item_id);

            let sig_score = sigmoid(model.score(u, i));
            let prediction = model.min_rating() + sig_score * range;
            let error = event.rating - prediction;
            let gradient_common = error * sig_score * (1.0 - sig_score) * range;

            for f in 0..num_factors {
                let u_f = model.user_factors.get(u, f);
                let i_f = model.item_factors.get(i, f);

                if f != USER_EXCLUDED_DIMENSION {
                    user_factors_gradient.inc(u, f, gradient_common * i_f);
                }
                if f != ITEM_EXCLUDED_DIMENSION {
                    item_factors_gradient.inc(i, f, gradient_common * u_f);
                }
            }
        }

        // L2 regularization
        for u in 0..num_users {
            user_bias_gradient[u] -= regularization * model.user_bias[u];
            for f in FIRST_REGULARIZED_DIMENSION..num_factors {
                user_factors_gradient.inc(u, f, -regularization * model.user_factors.get(u, f));
            }
        }

        for i in 0..num_items {
            item_bias_gradient[i] -= regularization * model.item_bias[i];
            for f in FIRST_REGULARIZED_DIMENSION..num_factors {
                item_factors_gradient.inc(i, f, -regularization * model.item_factors.get(i, f));
            }
        }

        // Trust network
        let means = self.neighbor_means();
        for u in 0..num_users {
            let term = self.social_term_with(u, &means);

            user_bias_gradient[u] += term.bias;
            for (f, value) in term.factors.into_iter().enumerate() {
                user_factors_gradient.inc(u, f, value);
            }
        }

        // Apply
        let model = &mut self.base.model;
        for u in 0..num_users {
            model.user_bias[u] += learn_rate * user_bias_gradient[u];
            for f in FIRST_REGULARIZED_DIMENSION..num_factors {
                model
                    .user_factors
                    .inc(u, f, learn_rate * user_factors_gradient.get(u, f));
            }
        }

        for i in 0..num_items {
            model.item_bias[i] += learn_rate * item_bias_gradient[i];
            for f in FIRST_REGULARIZED_DIMENSION..num_factors {
                model
                    .item_factors
                    .inc(i, f, learn_rate * item_factors_gradient.get(i, f));
            }
        }
    }
}

impl Recommender for SocialMf {
    fn train(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        self.init_model(rng)?;

        for iteration in 0..self.base.params.num_iter {
            self.iterate(rng)?;
            log::debug!("iteration {} fit {}", iteration, self.compute_fit());
        }

        Ok(())
    }

    fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        self.base.predict(user_id, item_id)
    }
}

impl IterativeModel for SocialMf {
    fn iterate(&mut self, _rng: &mut dyn RngCore) -> Result<()> {
        self.iterate_batch();

        if self.base.model.all_finite() {
            Ok(())
        } else {
            Err(ErrorKind::NonFinite("iterating SocialMF"))
        }
    }

    fn compute_fit(&self) -> f64 {
        self.base.compute_fit()
    }
}

impl fmt::Display for SocialMf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let params = &self.base.params;

        write!(
            f,
            "SocialMF num_factors={} regularization={} social_regularization={} learn_rate={} num_iter={} init_mean={} init_stdev={}",
            params.num_factors,
            params.regularization,
            self.social_regularization,
            params.learn_rate,
            params.num_iter,
            params.init_mean,
            params.init_stdev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn scenario() -> Ratings {
        vec![
            (0, 0, 5.0),
            (0, 1, 1.0),
            (1, 1, 5.0),
            (1, 2, 1.0),
            (2, 0, 5.0),
            (2, 2, 1.0),
        ]
        .into_iter()
        .collect()
    }

    fn relation(pairs: &[(usize, usize)]) -> SparseBooleanMatrix {
        let mut relation = SparseBooleanMatrix::new();
        for &(a, b) in pairs {
            relation.set(a, b, true);
            relation.set(b, a, true);
        }

        relation
    }

    fn params(num_factors: usize, learn_rate: f64) -> LatentFactorsConfig {
        LatentFactorsConfig {
            num_factors,
            regularization: 0.01,
            learn_rate,
            num_iter: 50,
            ..LatentFactorsConfig::default()
        }
    }

    fn social(social_regularization: f64) -> SocialConfig {
        SocialConfig {
            social_regularization,
        }
    }

    fn initialized(mf: &mut SocialMf, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        mf.init_model(&mut rng).unwrap();
    }

    #[test]
    fn relation_grows_user_count() {
        let mut mf = SocialMf::new(
            &params(4, 0.01),
            &social(1.0),
            &RatingsConfig::default(),
            scenario(),
            relation(&[(0, 6)]),
        )
        .unwrap();
        initialized(&mut mf, 0);

        assert_eq!(mf.base().model().num_users(), 7);
        assert_eq!(mf.learning_mode(), LearningMode::Batch);
    }

    #[test]
    fn no_neighbors_no_social_term() {
        for &strength in &[0.0, 1.0, 100.0] {
            let mut mf = SocialMf::new(
                &params(4, 0.01),
                &social(strength),
                &RatingsConfig::default(),
                scenario(),
                relation(&[(0, 2)]),
            )
            .unwrap();
            initialized(&mut mf, 11);

            let term = mf.social_term(1);
            assert_eq!(term, SocialTerm::zero(4));
        }
    }

    #[test]
    fn social_term_pulls_towards_neighbor() {
        let mut mf = SocialMf::new(
            &params(2, 0.01),
            &social(1.0),
            &RatingsConfig::default(),
            scenario(),
            relation(&[(0, 1)]),
        )
        .unwrap();
        initialized(&mut mf, 2);

        mf.base.model.user_bias = vec![1.0, -1.0, 0.0];

        // Direct pull: -(1 - (-1)) = -2; second hop through user 1, whose only
        // neighbor is user 0: (-1 - 1) / 1 = -2
        let term = mf.social_term(0);
        assert_approx_eq!(term.bias, -4.0);
    }

    #[test]
    fn zero_learn_rate_changes_nothing() {
        let mut mf = SocialMf::new(
            &params(4, 0.0),
            &social(1.0),
            &RatingsConfig::default(),
            scenario(),
            relation(&[(0, 1), (1, 2)]),
        )
        .unwrap();
        initialized(&mut mf, 3);

        let before = mf.base().model().clone();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..5 {
            mf.iterate(&mut rng).unwrap();
        }

        let after = mf.base().model();
        assert_eq!(after.user_factors, before.user_factors);
        assert_eq!(after.item_factors, before.item_factors);
        assert_eq!(after.user_bias, before.user_bias);
        assert_eq!(after.item_bias, before.item_bias);
    }

    #[test]
    fn excluded_dimensions_are_never_updated() {
        let mut mf = SocialMf::new(
            &params(4, 0.1),
            &social(1.0),
            &RatingsConfig::default(),
            scenario(),
            relation(&[(0, 1), (1, 2)]),
        )
        .unwrap();
        initialized(&mut mf, 4);

        let before = mf.base().model().clone();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..5 {
            mf.iterate(&mut rng).unwrap();
        }

        let after = mf.base().model();
        for u in 0..3 {
            for f in 0..FIRST_REGULARIZED_DIMENSION {
                assert_approx_eq!(after.user_factors.get(u, f), before.user_factors.get(u, f));
            }
        }
        assert_ne!(after.user_factors, before.user_factors);
    }

    #[test]
    fn fit_improves_with_enough_factors() {
        let mut mf = SocialMf::new(
            &params(4, 0.05),
            &social(0.01),
            &RatingsConfig::default(),
            scenario(),
            relation(&[(0, 2)]),
        )
        .unwrap();
        initialized(&mut mf, 42);

        let initial = mf.compute_fit();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            mf.iterate(&mut rng).unwrap();
        }

        assert!(mf.compute_fit() < initial);
    }
}
