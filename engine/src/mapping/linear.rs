// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::{AttributeToFactorMapping, MappingData, Target};
use crate::{factors::bpr::TripleSampler, matrix::Matrix, Result};
use config::MappingConfig;
use rand::{Rng, RngCore};

/// Loss the linear mapping is learned with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// Squared error between estimated and learned factors
    SquaredError,
    /// Pairwise ranking likelihood of the estimated factors
    Ranking,
    /// Squared error between scores against the other side's factors
    ScoreSpace,
    /// Absolute factor error, ignored below the given margin
    EpsilonInsensitive(f64),
}

/// Estimates factors as the sum of one learned row per attribute plus a bias
/// row, the last row of `attribute_to_factor`
pub struct LinearMapping {
    objective: Objective,
    params: MappingConfig,
    attribute_to_factor: Matrix<f64>,
}

impl LinearMapping {
    pub fn new(objective: Objective, params: &MappingConfig) -> Self {
        Self {
            objective,
            params: params.clone(),
            attribute_to_factor: Matrix::new(0, 0),
        }
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn attribute_to_factor(&self) -> &Matrix<f64> {
        &self.attribute_to_factor
    }

    fn num_attributes(&self) -> usize {
        self.attribute_to_factor.num_rows().saturating_sub(1)
    }

    fn bias_row(&self) -> usize {
        self.num_attributes()
    }

    /// Attribute rows of `entity_id` followed by the bias row
    fn rows_of(&self, data: &MappingData, entity_id: usize) -> Vec<usize> {
        let num_attributes = self.num_attributes();
        data.attributes
            .row_iter(entity_id)
            .filter(|&attribute| attribute < num_attributes)
            .chain(std::iter::once(self.bias_row()))
            .collect()
    }

    fn map(&self, rows: &[usize]) -> Vec<f64> {
        let mut factors = vec![0.0; self.attribute_to_factor.num_cols()];
        for &row in rows {
            for (f, value) in factors.iter_mut().enumerate() {
                *value += self.attribute_to_factor.get(row, f);
            }
        }

        factors
    }

    /// Gradient descent step on every row in `rows` for factor `f`
    fn descend(&mut self, rows: &[usize], f: usize, gradient: f64) {
        let learn_rate = self.params.learn_rate;
        let regularization = self.params.regularization;

        for &row in rows {
            let weight = self.attribute_to_factor.get(row, f);
            self.attribute_to_factor
                .inc(row, f, -learn_rate * (gradient + regularization * weight));
        }
    }

    fn random_target(data: &MappingData, rng: &mut dyn RngCore) -> usize {
        data.trained_targets[rng.gen_range(0, data.trained_targets.len())]
    }

    fn iterate_factor_space(&mut self, data: &MappingData, rng: &mut dyn RngCore) {
        for _ in 0..data.trained_targets.len() {
            let entity_id = Self::random_target(data, rng);
            let rows = self.rows_of(data, entity_id);
            let estimated = self.map(&rows);

            for (f, value) in estimated.iter().enumerate() {
                let difference = value - data.target_factors.get_or_zero(entity_id, f);

                let gradient = match self.objective {
                    Objective::EpsilonInsensitive(epsilon) if difference.abs() <= epsilon => 0.0,
                    Objective::EpsilonInsensitive(_) => difference.signum(),
                    _ => difference,
                };

                self.descend(&rows, f, gradient);
            }
        }
    }

    fn iterate_score_space(&mut self, data: &MappingData, rng: &mut dyn RngCore) {
        let num_factors = data.num_factors();

        for _ in 0..data.trained_targets.len() {
            let entity_id = Self::random_target(data, rng);
            let rows = self.rows_of(data, entity_id);

            let others: Vec<usize> = data.target_interactions.row_iter(entity_id).collect();
            for other_id in others {
                let estimated = self.map(&rows);

                let mut error = 0.0;
                for (f, value) in estimated.iter().enumerate() {
                    let other_f = data.other_factors.get_or_zero(other_id, f);
                    error += other_f * (value - data.target_factors.get_or_zero(entity_id, f));
                }

                for f in 0..num_factors {
                    let gradient = error * data.other_factors.get_or_zero(other_id, f);
                    self.descend(&rows, f, gradient);
                }
            }
        }
    }

    fn iterate_ranking(&mut self, data: &MappingData, rng: &mut dyn RngCore) {
        let num_samples = data.target_interactions.number_of_entries();

        let sampler = match data.target {
            Target::Items => TripleSampler::new(
                data.other_interactions,
                data.trained_others,
                data.trained_targets,
            ),
            Target::Users => TripleSampler::new(
                data.target_interactions,
                data.trained_targets,
                data.trained_others,
            ),
        };

        for _ in 0..num_samples {
            match sampler.sample(rng) {
                Some((u, i, j)) => self.update_ranking(data, u, i, j),
                None => break,
            }
        }
    }

    /// Ascends `ln σ(x_uij)` where the target side of the triple uses
    /// estimated factors
    fn update_ranking(&mut self, data: &MappingData, user_id: usize, item_id: usize, other_id: usize) {
        let num_factors = data.num_factors();
        let learn_rate = self.params.learn_rate;
        let regularization = self.params.regularization;

        match data.target {
            Target::Items => {
                let rows_i = self.rows_of(data, item_id);
                let rows_j = self.rows_of(data, other_id);
                let est_i = self.map(&rows_i);
                let est_j = self.map(&rows_j);

                let x_uij: f64 = (0..num_factors)
                    .map(|f| data.other_factors.get_or_zero(user_id, f) * (est_i[f] - est_j[f]))
                    .sum();
                let one_over_one_plus_ex = 1.0 / (1.0 + x_uij.exp());

                // Shared attributes and the bias row cancel out
                let mut coefficients: Vec<(usize, f64)> = Vec::new();
                for &row in &rows_i {
                    if !rows_j.contains(&row) {
                        coefficients.push((row, 1.0));
                    }
                }
                for &row in &rows_j {
                    if !rows_i.contains(&row) {
                        coefficients.push((row, -1.0));
                    }
                }

                for f in 0..num_factors {
                    let common = one_over_one_plus_ex * data.other_factors.get_or_zero(user_id, f);
                    for &(row, coefficient) in &coefficients {
                        let weight = self.attribute_to_factor.get(row, f);
                        self.attribute_to_factor.inc(
                            row,
                            f,
                            learn_rate * (coefficient * common - regularization * weight),
                        );
                    }
                }
            }
            Target::Users => {
                let rows_u = self.rows_of(data, user_id);
                let est_u = self.map(&rows_u);

                let x_uij: f64 = (0..num_factors)
                    .map(|f| {
                        est_u[f]
                            * (data.other_factors.get_or_zero(item_id, f)
                                - data.other_factors.get_or_zero(other_id, f))
                    })
                    .sum();
                let one_over_one_plus_ex = 1.0 / (1.0 + x_uij.exp());

                for f in 0..num_factors {
                    let common = one_over_one_plus_ex
                        * (data.other_factors.get_or_zero(item_id, f)
                            - data.other_factors.get_or_zero(other_id, f));

                    for &row in &rows_u {
                        let weight = self.attribute_to_factor.get(row, f);
                        self.attribute_to_factor
                            .inc(row, f, learn_rate * (common - regularization * weight));
                    }
                }
            }
        }
    }
}

impl AttributeToFactorMapping for LinearMapping {
    fn init(&mut self, data: &MappingData, rng: &mut dyn RngCore) -> Result<()> {
        let num_attributes = data.attributes.number_of_columns();

        self.attribute_to_factor = Matrix::normal(
            num_attributes + 1,
            data.num_factors(),
            self.params.init_mean,
            self.params.init_stdev,
            rng,
        )?;

        log::debug!(
            "{:?} mapping over {} attributes and {} factors",
            self.objective,
            num_attributes,
            data.num_factors()
        );
        Ok(())
    }

    fn iterate(&mut self, data: &MappingData, rng: &mut dyn RngCore) {
        if data.trained_targets.is_empty() {
            return;
        }

        match self.objective {
            Objective::SquaredError | Objective::EpsilonInsensitive(_) => {
                self.iterate_factor_space(data, rng)
            }
            Objective::ScoreSpace => self.iterate_score_space(data, rng),
            Objective::Ranking => self.iterate_ranking(data, rng),
        }
    }

    fn num_iter(&self) -> usize {
        self.params.num_iter
    }

    fn estimate_factors(&self, data: &MappingData, entity_id: usize) -> Vec<f64> {
        self.map(&self.rows_of(data, entity_id))
    }
}
