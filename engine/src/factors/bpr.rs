// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{
    error::ErrorKind,
    eval::items::auc,
    matrix::Matrix,
    scored::{rank, ScoredId},
    IterativeModel, Recommender, Result,
};
use config::BprConfig;
use controller::SparseBooleanMatrix;
use rand::{Rng, RngCore};
use std::fmt;

/// Matrix factorization for positive-only feedback, learned by stochastic
/// gradient ascent on the pairwise ranking criterion over sampled
/// (user, positive item, negative item) triples
pub struct BprMf {
    params: BprConfig,
    data_user: SparseBooleanMatrix,
    trained_users: Vec<usize>,
    trained_items: Vec<usize>,
    sampler: TripleSampler,
    num_users: usize,
    num_items: usize,

    user_factors: Matrix<f64>,
    item_factors: Matrix<f64>,
    item_bias: Vec<f64>,
}

impl BprMf {
    pub fn new(params: &BprConfig, data_user: SparseBooleanMatrix) -> Self {
        let num_users = data_user.number_of_rows();
        let num_items = data_user.number_of_columns();

        let trained_users: Vec<usize> = data_user.non_empty_row_ids().into_iter().collect();
        let trained_items: Vec<usize> =
            data_user.transpose().non_empty_row_ids().into_iter().collect();
        let sampler = TripleSampler::new(&data_user, &trained_users, &trained_items);

        Self {
            params: params.clone(),
            data_user,
            trained_users,
            trained_items,
            sampler,
            num_users,
            num_items,
            user_factors: Matrix::new(0, params.num_factors),
            item_factors: Matrix::new(0, params.num_factors),
            item_bias: Vec::new(),
        }
    }

    pub fn set_num_users(&mut self, num_users: usize) {
        self.num_users = self.num_users.max(num_users);
    }

    pub fn set_num_items(&mut self, num_items: usize) {
        self.num_items = self.num_items.max(num_items);
    }

    pub fn num_factors(&self) -> usize {
        self.params.num_factors
    }

    pub fn data_user(&self) -> &SparseBooleanMatrix {
        &self.data_user
    }

    pub fn user_factors(&self) -> &Matrix<f64> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &Matrix<f64> {
        &self.item_factors
    }

    /// Users with at least one positive item
    pub fn trained_users(&self) -> &[usize] {
        &self.trained_users
    }

    /// Items with at least one positive user
    pub fn trained_items(&self) -> &[usize] {
        &self.trained_items
    }

    pub fn sampler(&self) -> &TripleSampler {
        &self.sampler
    }

    /// Overwrites the factors of one user, used to plug in estimated factors
    pub fn set_user_factors(&mut self, user_id: usize, factors: &[f64]) {
        if self.user_factors.has_row(user_id) {
            self.user_factors.set_row(user_id, factors);
        }
    }

    /// Overwrites the factors of one item, used to plug in estimated factors
    pub fn set_item_factors(&mut self, item_id: usize, factors: &[f64]) {
        if self.item_factors.has_row(item_id) {
            self.item_factors.set_row(item_id, factors);
        }
    }

    fn init_model(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        let (mean, stdev) = (self.params.init_mean, self.params.init_stdev);

        self.user_factors = Matrix::normal(self.num_users, self.params.num_factors, mean, stdev, rng)?;
        self.item_factors = Matrix::normal(self.num_items, self.params.num_factors, mean, stdev, rng)?;
        self.item_bias = vec![0.0; self.num_items];

        Ok(())
    }

    fn update_factors(&mut self, user_id: usize, item_id: usize, other_id: usize) {
        let learn_rate = self.params.learn_rate;

        let x_uij = self.item_bias[item_id] - self.item_bias[other_id]
            + self.user_factors.row_dot(user_id, &self.item_factors, item_id)
            - self.user_factors.row_dot(user_id, &self.item_factors, other_id);

        let one_over_one_plus_ex = 1.0 / (1.0 + x_uij.exp());

        let bias_reg = self.params.bias_reg;
        self.item_bias[item_id] +=
            learn_rate * (one_over_one_plus_ex - bias_reg * self.item_bias[item_id]);
        self.item_bias[other_id] +=
            learn_rate * (-one_over_one_plus_ex - bias_reg * self.item_bias[other_id]);

        for f in 0..self.params.num_factors {
            let w_uf = self.user_factors.get(user_id, f);
            let h_if = self.item_factors.get(item_id, f);
            let h_jf = self.item_factors.get(other_id, f);

            let user_delta = (h_if - h_jf) * one_over_one_plus_ex - self.params.reg_u * w_uf;
            self.user_factors.inc(user_id, f, learn_rate * user_delta);

            let item_delta = w_uf * one_over_one_plus_ex - self.params.reg_i * h_if;
            self.item_factors.inc(item_id, f, learn_rate * item_delta);

            let other_delta = -w_uf * one_over_one_plus_ex - self.params.reg_j * h_jf;
            self.item_factors.inc(other_id, f, learn_rate * other_delta);
        }
    }

    /// Score of every trained item for `user_id`, best first
    pub fn ranked_items(&self, user_id: usize) -> Vec<ScoredId> {
        let mut scored: Vec<_> = self
            .trained_items
            .iter()
            .map(|&item_id| ScoredId(item_id, self.predict(user_id, item_id)))
            .collect();

        rank(&mut scored);
        scored
    }
}

/// Draws (anchor, positive column, negative column) triples.
///
/// Anchors without a positive or without a negative among `columns` are
/// dropped once at construction, so every draw has expected constant cost:
/// the positive is picked from the anchor's sorted row and the negative is
/// rejected until it falls outside that row.
#[derive(Debug, Clone, Default)]
pub struct TripleSampler {
    anchors: Vec<usize>,
    positives: Vec<Vec<usize>>,
    columns: Vec<usize>,
}

impl TripleSampler {
    pub fn new(data: &SparseBooleanMatrix, anchors: &[usize], columns: &[usize]) -> Self {
        let mut columns = columns.to_vec();
        columns.sort_unstable();
        columns.dedup();

        let mut sampleable = Vec::new();
        let mut positives = Vec::new();
        for &anchor in anchors {
            let row: Vec<usize> = data.row_iter(anchor).collect();
            let covered = row
                .iter()
                .filter(|&&column| columns.binary_search(&column).is_ok())
                .count();

            if !row.is_empty() && covered < columns.len() {
                sampleable.push(anchor);
                positives.push(row);
            }
        }

        Self {
            anchors: sampleable,
            positives,
            columns,
        }
    }

    /// Anchors that can be drawn
    pub fn anchors(&self) -> &[usize] {
        &self.anchors
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// `None` when no anchor has both a positive and a negative column
    pub fn sample(&self, rng: &mut dyn RngCore) -> Option<(usize, usize, usize)> {
        if self.anchors.is_empty() {
            return None;
        }

        let index = rng.gen_range(0, self.anchors.len());
        let positives = &self.positives[index];
        let positive = positives[rng.gen_range(0, positives.len())];

        let negative = loop {
            let column = self.columns[rng.gen_range(0, self.columns.len())];
            if positives.binary_search(&column).is_err() {
                break column;
            }
        };

        Some((self.anchors[index], positive, negative))
    }
}

impl Recommender for BprMf {
    fn train(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        if self.data_user.number_of_entries() == 0 {
            return Err(ErrorKind::EmptyRatings);
        }

        self.init_model(rng)?;

        for iteration in 0..self.params.num_iter {
            self.iterate(rng)?;
            log::debug!("iteration {} done", iteration);
        }

        Ok(())
    }

    fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        let bias = self.item_bias.get(item_id).copied().unwrap_or(0.0);
        bias + self.user_factors.row_dot(user_id, &self.item_factors, item_id)
    }
}

impl IterativeModel for BprMf {
    fn iterate(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        let num_samples = self.data_user.number_of_entries();

        for _ in 0..num_samples {
            match self.sampler.sample(rng) {
                Some((u, i, j)) => self.update_factors(u, i, j),
                None => break,
            }
        }

        if self.user_factors.all_finite() && self.item_factors.all_finite() {
            Ok(())
        } else {
            Err(ErrorKind::NonFinite("iterating BPR-MF"))
        }
    }

    /// Mean AUC over training users, their positive items against every
    /// other trained item
    fn compute_fit(&self) -> f64 {
        let mut sum = 0.0;
        let mut num_users = 0;

        for &user_id in &self.trained_users {
            let positives = match self.data_user.row(user_id) {
                Some(positives) if positives.len() < self.trained_items.len() => positives,
                _ => continue,
            };

            let ranked: Vec<usize> = self.ranked_items(user_id).iter().map(ScoredId::id).collect();
            sum += auc(&ranked, positives);
            num_users += 1;
        }

        if num_users > 0 {
            sum / num_users as f64
        } else {
            0.0
        }
    }
}

impl fmt::Display for BprMf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BPR-MF num_factors={} bias_reg={} reg_u={} reg_i={} reg_j={} num_iter={} learn_rate={} init_mean={} init_stdev={}",
            self.params.num_factors,
            self.params.bias_reg,
            self.params.reg_u,
            self.params.reg_i,
            self.params.reg_j,
            self.params.num_iter,
            self.params.learn_rate,
            self.params.init_mean,
            self.params.init_stdev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn data() -> SparseBooleanMatrix {
        let mut data = SparseBooleanMatrix::new();

        // Two groups of users with disjoint tastes
        for u in 0..10 {
            let items = if u % 2 == 0 { 0..5 } else { 5..10 };
            for i in items {
                if (u + i) % 3 != 0 {
                    data.set(u, i, true);
                }
            }
        }

        data
    }

    #[test]
    fn training_improves_auc() {
        let mut rng = StdRng::seed_from_u64(17);
        let params = BprConfig {
            num_iter: 100,
            ..BprConfig::default()
        };

        let mut bpr = BprMf::new(&params, data());
        bpr.init_model(&mut rng).unwrap();
        let initial = bpr.compute_fit();

        for _ in 0..params.num_iter {
            bpr.iterate(&mut rng).unwrap();
        }

        let fit = bpr.compute_fit();
        assert!(fit > initial, "{} <= {}", fit, initial);
    }

    #[test]
    fn negatives_come_from_unseen_trained_items() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut bpr = BprMf::new(&BprConfig::default(), data());
        bpr.set_num_items(20);
        bpr.init_model(&mut rng).unwrap();

        for _ in 0..200 {
            let (u, i, j) = bpr.sampler().sample(&mut rng).unwrap();
            assert!(bpr.data_user().get(u, i));
            assert!(!bpr.data_user().get(u, j));
            assert!(j < 10);
        }
    }

    #[test]
    fn anchors_without_negatives_are_never_drawn() {
        let mut data = SparseBooleanMatrix::new();
        for i in 0..4 {
            data.set(0, i, true);
        }
        data.set(1, 0, true);
        data.set(2, 3, true);

        let sampler = TripleSampler::new(&data, &[0, 1, 2, 5], &[0, 1, 2, 3]);
        assert_eq!(sampler.anchors(), &[1, 2]);

        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let (u, i, j) = sampler.sample(&mut rng).unwrap();
            assert_ne!(u, 0);
            assert!(data.get(u, i));
            assert!(!data.get(u, j));
        }

        let saturated = TripleSampler::new(&data, &[0], &[0, 1, 2, 3]);
        assert!(saturated.is_empty());
        assert_eq!(saturated.sample(&mut rng), None);
    }

    #[test]
    fn iterates_over_a_few_hundred_users() {
        let mut rng = StdRng::seed_from_u64(400);
        let mut data = SparseBooleanMatrix::new();
        for u in 0..400 {
            for _ in 0..20 {
                data.set(u, rng.gen_range(0, 400), true);
            }
        }

        let params = BprConfig {
            num_iter: 1,
            ..BprConfig::default()
        };

        let mut bpr = BprMf::new(&params, data);
        assert_eq!(bpr.sampler().anchors().len(), 400);

        bpr.train(&mut rng).unwrap();
        assert!(bpr.user_factors().all_finite());
    }

    #[test]
    fn unknown_ids_score_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut bpr = BprMf::new(&BprConfig::default(), data());
        bpr.train(&mut rng).unwrap();

        assert_eq!(bpr.predict(100, 100), 0.0);
    }

    #[test]
    fn empty_data_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut bpr = BprMf::new(&BprConfig::default(), SparseBooleanMatrix::new());
        assert_eq!(bpr.train(&mut rng), Err(ErrorKind::EmptyRatings));
    }
}
