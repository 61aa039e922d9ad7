// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{error::ErrorKind, matrix::grow_vec, Result};
use controller::Ratings;

/// Global average plus regularized user and item biases
#[derive(Debug, Clone, Default)]
pub struct UserItemBaseline {
    reg_u: f64,
    reg_i: f64,
    global_average: f64,
    user_biases: Vec<f64>,
    item_biases: Vec<f64>,
}

impl UserItemBaseline {
    pub fn new(reg_u: f64, reg_i: f64) -> Self {
        Self {
            reg_u,
            reg_i,
            ..Default::default()
        }
    }

    pub fn train(&mut self, ratings: &Ratings) -> Result<()> {
        self.global_average = ratings.average().ok_or(ErrorKind::EmptyRatings)?;
        self.user_biases = vec![0.0; ratings.num_users()];
        self.item_biases = vec![0.0; ratings.num_items()];

        for item_id in 0..ratings.num_items() {
            self.optimize_item(ratings, item_id);
        }

        for user_id in 0..ratings.num_users() {
            self.optimize_user(ratings, user_id);
        }

        Ok(())
    }

    pub fn retrain_user(&mut self, ratings: &Ratings, user_id: usize) {
        self.optimize_user(ratings, user_id);
    }

    pub fn retrain_item(&mut self, ratings: &Ratings, item_id: usize) {
        self.optimize_item(ratings, item_id);
    }

    fn optimize_item(&mut self, ratings: &Ratings, item_id: usize) {
        grow_vec(&mut self.item_biases, item_id + 1);

        let mut sum = 0.0;
        for event in ratings.by_item(item_id) {
            sum += event.rating - self.global_average - self.user_bias(event.user_id);
        }

        let denominator = self.reg_i + ratings.count_by_item(item_id) as f64;
        self.item_biases[item_id] = if denominator > 0.0 { sum / denominator } else { 0.0 };
    }

    fn optimize_user(&mut self, ratings: &Ratings, user_id: usize) {
        grow_vec(&mut self.user_biases, user_id + 1);

        let mut sum = 0.0;
        for event in ratings.by_user(user_id) {
            sum += event.rating - self.global_average - self.item_bias(event.item_id);
        }

        let denominator = self.reg_u + ratings.count_by_user(user_id) as f64;
        self.user_biases[user_id] = if denominator > 0.0 { sum / denominator } else { 0.0 };
    }

    pub fn global_average(&self) -> f64 {
        self.global_average
    }

    pub fn user_bias(&self, user_id: usize) -> f64 {
        self.user_biases.get(user_id).copied().unwrap_or(0.0)
    }

    pub fn item_bias(&self, item_id: usize) -> f64 {
        self.item_biases.get(item_id).copied().unwrap_or(0.0)
    }

    pub fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        self.global_average + self.user_bias(user_id) + self.item_bias(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn unregularized_biases() {
        let ratings: Ratings = vec![(0, 0, 4.0), (0, 1, 2.0), (1, 0, 4.0)]
            .into_iter()
            .collect();

        let mut baseline = UserItemBaseline::new(0.0, 0.0);
        baseline.train(&ratings).unwrap();

        // mean 10/3, item 0 mean 4, item 1 mean 2
        assert_approx_eq!(baseline.global_average(), 10.0 / 3.0);
        assert_approx_eq!(baseline.item_bias(0), 4.0 - 10.0 / 3.0);
        assert_approx_eq!(baseline.item_bias(1), 2.0 - 10.0 / 3.0);
        assert_approx_eq!(baseline.user_bias(0), 0.0);
        assert_approx_eq!(baseline.predict(1, 0), 4.0);
    }

    #[test]
    fn regularization_shrinks_towards_mean() {
        let ratings: Ratings = vec![(0, 0, 5.0), (1, 1, 1.0)].into_iter().collect();

        let mut baseline = UserItemBaseline::new(0.0, 1.0);
        baseline.train(&ratings).unwrap();

        // (5 - 3) / (1 + 1)
        assert_approx_eq!(baseline.item_bias(0), 1.0);
    }

    #[test]
    fn unknown_ids_predict_global_average() {
        let ratings: Ratings = vec![(0, 0, 3.0)].into_iter().collect();

        let mut baseline = UserItemBaseline::new(1.0, 1.0);
        baseline.train(&ratings).unwrap();

        assert_approx_eq!(baseline.predict(10, 10), 3.0);
    }

    #[test]
    fn empty_ratings_fail() {
        let mut baseline = UserItemBaseline::new(1.0, 1.0);
        assert_eq!(baseline.train(&Ratings::new()), Err(ErrorKind::EmptyRatings));
    }
}
