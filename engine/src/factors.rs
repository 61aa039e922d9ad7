// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod biased;
pub mod bpr;
pub mod social;

use crate::{
    error::ErrorKind,
    matrix::{grow_vec, Matrix},
    Result,
};
use controller::Ratings;
use rand::RngCore;

/// User factor dimension that never receives the error gradient in batch mode
pub const USER_EXCLUDED_DIMENSION: usize = 0;

/// Item factor dimension that never receives the error gradient in batch mode
pub const ITEM_EXCLUDED_DIMENSION: usize = 1;

/// Lowest factor dimension touched by L2 regularization and by the batch
/// update step
pub const FIRST_REGULARIZED_DIMENSION: usize = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LearningMode {
    /// One update per rating
    Stochastic,
    /// One update per pass, after the gradients of every rating are summed
    Batch,
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Logit of the mean rating inside `[min, max]`, the mean is kept strictly
/// inside the range so the result is always finite
pub fn global_bias(mean: f64, min_rating: f64, max_rating: f64) -> f64 {
    let margin = (max_rating - min_rating) * 1e-6;
    let mean = mean.max(min_rating + margin).min(max_rating - margin);

    ((mean - min_rating) / (max_rating - mean)).ln()
}

/// Embeddings and biases of a sigmoid-bounded rating model
#[derive(Debug, Clone)]
pub struct LatentFactors {
    pub user_factors: Matrix<f64>,
    pub item_factors: Matrix<f64>,
    pub user_bias: Vec<f64>,
    pub item_bias: Vec<f64>,
    pub global_bias: f64,
    min_rating: f64,
    max_rating: f64,
}

impl LatentFactors {
    pub fn new(num_factors: usize, min_rating: f64, max_rating: f64) -> Result<Self> {
        if !(max_rating > min_rating) {
            return Err(ErrorKind::InvalidRatingRange(min_rating, max_rating));
        }

        Ok(Self {
            user_factors: Matrix::new(0, num_factors),
            item_factors: Matrix::new(0, num_factors),
            user_bias: Vec::new(),
            item_bias: Vec::new(),
            global_bias: 0.0,
            min_rating,
            max_rating,
        })
    }

    /// Drops every learned value and draws fresh factors for
    /// `num_users × num_items`
    pub fn reset(
        &mut self,
        num_users: usize,
        num_items: usize,
        init_mean: f64,
        init_stdev: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let num_factors = self.num_factors();

        self.user_factors = Matrix::normal(num_users, num_factors, init_mean, init_stdev, rng)?;
        self.item_factors = Matrix::normal(num_items, num_factors, init_mean, init_stdev, rng)?;
        self.user_bias = vec![0.0; num_users];
        self.item_bias = vec![0.0; num_items];

        Ok(())
    }

    pub fn grow_users(
        &mut self,
        num_users: usize,
        init_mean: f64,
        init_stdev: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.user_factors
            .grow_rows_normal(num_users, init_mean, init_stdev, rng)?;
        grow_vec(&mut self.user_bias, num_users);
        Ok(())
    }

    pub fn grow_items(
        &mut self,
        num_items: usize,
        init_mean: f64,
        init_stdev: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.item_factors
            .grow_rows_normal(num_items, init_mean, init_stdev, rng)?;
        grow_vec(&mut self.item_bias, num_items);
        Ok(())
    }

    pub fn num_factors(&self) -> usize {
        self.user_factors.num_cols()
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.num_rows()
    }

    pub fn num_items(&self) -> usize {
        self.item_factors.num_rows()
    }

    pub fn rating_range(&self) -> f64 {
        self.max_rating - self.min_rating
    }

    pub fn min_rating(&self) -> f64 {
        self.min_rating
    }

    pub fn max_rating(&self) -> f64 {
        self.max_rating
    }

    /// Unbounded score, unknown IDs contribute nothing
    pub fn score(&self, user_id: usize, item_id: usize) -> f64 {
        self.global_bias
            + self.user_bias.get(user_id).copied().unwrap_or(0.0)
            + self.item_bias.get(item_id).copied().unwrap_or(0.0)
            + self.user_factors.row_dot(user_id, &self.item_factors, item_id)
    }

    /// Maps a score into `[min_rating, max_rating]`
    pub fn squash(&self, score: f64) -> f64 {
        self.min_rating + sigmoid(score) * self.rating_range()
    }

    pub fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        self.squash(self.score(user_id, item_id))
    }

    /// Root mean squared error over `ratings`
    pub fn rmse(&self, ratings: &Ratings) -> f64 {
        if ratings.is_empty() {
            return 0.0;
        }

        let squared: f64 = ratings
            .all()
            .iter()
            .map(|event| (event.rating - self.predict(event.user_id, event.item_id)).powi(2))
            .sum();

        (squared / ratings.len() as f64).sqrt()
    }

    pub fn all_finite(&self) -> bool {
        self.global_bias.is_finite()
            && self.user_factors.all_finite()
            && self.item_factors.all_finite()
            && self.user_bias.iter().all(|b| b.is_finite())
            && self.item_bias.iter().all(|b| b.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn sigmoid_saturates() {
        assert_approx_eq!(sigmoid(0.0), 0.5);
        assert_approx_eq!(sigmoid(1e6), 1.0);
        assert_approx_eq!(sigmoid(-1e6), 0.0);
    }

    #[test]
    fn predictions_bounded_for_extreme_parameters() {
        let mut factors = LatentFactors::new(2, 1.0, 5.0).unwrap();
        factors.user_factors = Matrix::from_rows(vec![vec![1e6, -1e6], vec![-1e6, 1e6]]);
        factors.item_factors = Matrix::from_rows(vec![vec![1e6, 1e6], vec![-1e6, -1e6]]);
        factors.user_bias = vec![1e6, -1e6];
        factors.item_bias = vec![-1e6, 1e6];

        for &global in &[1e6, -1e6, 0.0] {
            factors.global_bias = global;

            for u in 0..3 {
                for i in 0..3 {
                    let prediction = factors.predict(u, i);
                    assert!(prediction >= 1.0 && prediction <= 5.0, "{}", prediction);
                }
            }
        }
    }

    #[test]
    fn global_bias_is_logit_of_mean() {
        assert_approx_eq!(global_bias(3.0, 1.0, 5.0), 0.0);
        assert_approx_eq!(global_bias(4.0, 1.0, 5.0), 3f64.ln());
        assert!(global_bias(5.0, 1.0, 5.0).is_finite());
        assert!(global_bias(1.0, 1.0, 5.0).is_finite());
    }

    #[test]
    fn empty_range_is_rejected() {
        assert_eq!(
            LatentFactors::new(2, 5.0, 5.0).unwrap_err(),
            ErrorKind::InvalidRatingRange(5.0, 5.0)
        );
    }
}
