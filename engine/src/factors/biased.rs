// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::{global_bias, sigmoid, LatentFactors, LearningMode};
use crate::{error::ErrorKind, IterativeModel, Recommender, Result};
use config::{LatentFactorsConfig, RatingsConfig};
use controller::{RatingEvent, Ratings};
use rand::RngCore;
use std::fmt;

/// Biased matrix factorization with a sigmoid squashed prediction, learned
/// by stochastic gradient descent over the training ratings
pub struct BiasedMatrixFactorization {
    pub(crate) params: LatentFactorsConfig,
    pub(crate) ratings: Ratings,
    pub(crate) model: LatentFactors,
    pub(crate) num_users: usize,
    pub(crate) num_items: usize,
}

impl BiasedMatrixFactorization {
    pub fn new(params: &LatentFactorsConfig, range: &RatingsConfig, ratings: Ratings) -> Result<Self> {
        let model = LatentFactors::new(params.num_factors, range.min_rating, range.max_rating)?;

        Ok(Self {
            params: params.clone(),
            num_users: ratings.num_users(),
            num_items: ratings.num_items(),
            ratings,
            model,
        })
    }

    pub fn learning_mode(&self) -> LearningMode {
        LearningMode::Stochastic
    }

    pub fn model(&self) -> &LatentFactors {
        &self.model
    }

    pub fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    /// Makes room for users beyond the training data, never shrinks
    pub fn set_num_users(&mut self, num_users: usize) {
        self.num_users = self.num_users.max(num_users);
    }

    /// Makes room for items beyond the training data, never shrinks
    pub fn set_num_items(&mut self, num_items: usize) {
        self.num_items = self.num_items.max(num_items);
    }

    /// Fresh factors, zero biases and the logit of the mean rating as global
    /// bias
    pub(crate) fn init_model(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        let mean = self.ratings.average().ok_or(ErrorKind::EmptyRatings)?;

        self.model.reset(
            self.num_users,
            self.num_items,
            self.params.init_mean,
            self.params.init_stdev,
            rng,
        )?;
        self.model.global_bias =
            global_bias(mean, self.model.min_rating(), self.model.max_rating());

        log::debug!(
            "num_users={}, num_items={}, global_bias={}",
            self.num_users,
            self.num_items,
            self.model.global_bias
        );
        Ok(())
    }

    /// One SGD pass over `events`
    pub fn iterate_sgd(&mut self, events: &[RatingEvent], update_user: bool, update_item: bool) {
        let learn_rate = self.params.learn_rate;
        let regularization = self.params.regularization;
        let range = self.model.rating_range();

        for event in events {
            let (u, i) = (event.user_id, event.item_id);

            let sig_score = sigmoid(self.model.score(u, i));
            let prediction = self.model.min_rating() + sig_score * range;
            let error = event.rating - prediction;
            let gradient_common = error * sig_score * (1.0 - sig_score) * range;

            if update_user {
                let bias = self.model.user_bias[u];
                self.model.user_bias[u] += learn_rate * (gradient_common - regularization * bias);
            }

            if update_item {
                let bias = self.model.item_bias[i];
                self.model.item_bias[i] += learn_rate * (gradient_common - regularization * bias);
            }

            for f in 0..self.model.num_factors() {
                let u_f = self.model.user_factors.get(u, f);
                let i_f = self.model.item_factors.get(i, f);

                if update_user {
                    let delta = gradient_common * i_f - regularization * u_f;
                    self.model.user_factors.inc(u, f, learn_rate * delta);
                }

                if update_item {
                    let delta = gradient_common * u_f - regularization * i_f;
                    self.model.item_factors.inc(i, f, learn_rate * delta);
                }
            }
        }
    }

    /// Registers a rating after training and relearns the user and the
    /// item rows touched by it
    pub fn add_rating(&mut self, event: RatingEvent, rng: &mut dyn RngCore) -> Result<()> {
        self.ratings.add(event);
        self.set_num_users(event.user_id + 1);
        self.set_num_items(event.item_id + 1);

        self.model
            .grow_users(self.num_users, self.params.init_mean, self.params.init_stdev, rng)?;
        self.model
            .grow_items(self.num_items, self.params.init_mean, self.params.init_stdev, rng)?;

        self.retrain_user(event.user_id);
        self.retrain_item(event.item_id);
        Ok(())
    }

    pub fn retrain_user(&mut self, user_id: usize) {
        let events: Vec<_> = self.ratings.by_user(user_id).copied().collect();
        for _ in 0..self.params.num_iter {
            self.iterate_sgd(&events, true, false);
        }
    }

    pub fn retrain_item(&mut self, item_id: usize) {
        let events: Vec<_> = self.ratings.by_item(item_id).copied().collect();
        for _ in 0..self.params.num_iter {
            self.iterate_sgd(&events, false, true);
        }
    }
}

impl Recommender for BiasedMatrixFactorization {
    fn train(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        self.init_model(rng)?;

        for iteration in 0..self.params.num_iter {
            self.iterate(rng)?;
            log::debug!("iteration {} fit {}", iteration, self.compute_fit());
        }

        Ok(())
    }

    fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        self.model.predict(user_id, item_id)
    }
}

impl IterativeModel for BiasedMatrixFactorization {
    fn iterate(&mut self, _rng: &mut dyn RngCore) -> Result<()> {
        let events = self.ratings.all().to_vec();
        self.iterate_sgd(&events, true, true);

        if self.model.all_finite() {
            Ok(())
        } else {
            Err(ErrorKind::NonFinite("iterating biased matrix factorization"))
        }
    }

    fn compute_fit(&self) -> f64 {
        self.model.rmse(&self.ratings)
    }
}

impl fmt::Display for BiasedMatrixFactorization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BiasedMatrixFactorization num_factors={} regularization={} learn_rate={} num_iter={} init_mean={} init_stdev={}",
            self.params.num_factors,
            self.params.regularization,
            self.params.learn_rate,
            self.params.num_iter,
            self.params.init_mean,
            self.params.init_stdev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn params() -> LatentFactorsConfig {
        LatentFactorsConfig {
            num_factors: 2,
            regularization: 0.01,
            learn_rate: 0.01,
            num_iter: 50,
            ..LatentFactorsConfig::default()
        }
    }

    #[test]
    fn fit_improves_over_first_iterations() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut mf =
            BiasedMatrixFactorization::new(&params(), &RatingsConfig::default(), scenario()).unwrap();

        mf.init_model(&mut rng).unwrap();
        let initial = mf.compute_fit();

        let mut fits = vec![initial];
        for _ in 0..10 {
            mf.iterate(&mut rng).unwrap();
            fits.push(mf.compute_fit());
        }

        assert!(fits[10] < initial, "{:?}", fits);
        assert!(fits[5] < initial, "{:?}", fits);
    }

    #[test]
    fn zero_learn_rate_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let zero = LatentFactorsConfig {
            learn_rate: 0.0,
            ..params()
        };

        let mut mf =
            BiasedMatrixFactorization::new(&zero, &RatingsConfig::default(), scenario()).unwrap();
        mf.init_model(&mut rng).unwrap();

        let before = mf.model().clone();
        for _ in 0..5 {
            mf.iterate(&mut rng).unwrap();
        }

        assert_eq!(mf.model().user_factors, before.user_factors);
        assert_eq!(mf.model().item_factors, before.item_factors);
        assert_eq!(mf.model().user_bias, before.user_bias);
        assert_eq!(mf.model().item_bias, before.item_bias);
    }

    #[test]
    fn predictions_within_range_after_training() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut mf =
            BiasedMatrixFactorization::new(&params(), &RatingsConfig::default(), scenario()).unwrap();
        mf.train(&mut rng).unwrap();

        for u in 0..4 {
            for i in 0..4 {
                let prediction = mf.predict(u, i);
                assert!(prediction >= 1.0 && prediction <= 5.0);
            }
        }
    }

    #[test]
    fn add_rating_grows_model() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut mf =
            BiasedMatrixFactorization::new(&params(), &RatingsConfig::default(), scenario()).unwrap();
        mf.train(&mut rng).unwrap();

        mf.add_rating(RatingEvent::new(4, 3, 5.0), &mut rng).unwrap();

        assert_eq!(mf.model().num_users(), 5);
        assert_eq!(mf.model().num_items(), 4);
        assert!(mf.predict(4, 3) > mf.model().squash(mf.model().global_bias));
    }

    #[test]
    fn empty_ratings_fail_to_train() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut mf =
            BiasedMatrixFactorization::new(&params(), &RatingsConfig::default(), Ratings::new())
                .unwrap();

        assert_eq!(mf.train(&mut rng), Err(ErrorKind::EmptyRatings));
    }
}
