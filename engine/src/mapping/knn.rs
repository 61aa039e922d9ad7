// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::{AttributeToFactorMapping, MappingData};
use crate::{
    correlation::{CorrelationMatrix, Method},
    Result,
};
use rand::RngCore;

/// Estimates factors as the correlation weighted average of the `k` trained
/// entities with the most similar attributes
pub struct KnnMapping {
    k: usize,
    correlation: CorrelationMatrix,
}

impl KnnMapping {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            correlation: CorrelationMatrix::new(0, Method::Cosine),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }
}

impl AttributeToFactorMapping for KnnMapping {
    fn init(&mut self, data: &MappingData, _rng: &mut dyn RngCore) -> Result<()> {
        self.correlation = CorrelationMatrix::create(data.attributes, Method::Cosine);
        Ok(())
    }

    /// Nothing to learn beyond the correlations
    fn iterate(&mut self, _data: &MappingData, _rng: &mut dyn RngCore) {}

    fn num_iter(&self) -> usize {
        0
    }

    fn estimate_factors(&self, data: &MappingData, entity_id: usize) -> Vec<f64> {
        let mut factors = vec![0.0; data.num_factors()];

        let neighbors = self.correlation.neighbors(
            entity_id,
            data.trained_targets.iter().copied(),
            Some(self.k),
        );

        let mut weight_sum = 0.0;
        for neighbor in neighbors.iter().filter(|neighbor| neighbor.score() > 0.0) {
            weight_sum += neighbor.score();
            for (f, value) in factors.iter_mut().enumerate() {
                *value += neighbor.score() * data.target_factors.get_or_zero(neighbor.id(), f);
            }
        }

        if weight_sum > 0.0 {
            for value in factors.iter_mut() {
                *value /= weight_sum;
            }
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mapping::Target, matrix::Matrix};
    use assert_approx_eq::assert_approx_eq;
    use controller::SparseBooleanMatrix;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn estimate_averages_similar_neighbors() {
        let mut attributes = SparseBooleanMatrix::new();
        for &(entity, attribute) in &[(0, 0), (1, 0), (2, 1), (3, 0)] {
            attributes.set(entity, attribute, true);
        }

        let item_factors = Matrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![3.0, 2.0],
            vec![-5.0, 5.0],
            vec![9.0, 9.0],
        ]);
        let user_factors = Matrix::new(1, 2);
        let interactions = SparseBooleanMatrix::new();
        let trained = vec![0, 1, 2];

        let data = MappingData {
            target: Target::Items,
            attributes: &attributes,
            target_factors: &item_factors,
            other_factors: &user_factors,
            target_interactions: &interactions,
            other_interactions: &interactions,
            trained_targets: &trained,
            trained_others: &[],
        };

        let mut mapping = KnnMapping::new(5);
        mapping.learn(&data, &mut StdRng::seed_from_u64(0)).unwrap();

        // Item 3 shares its attribute with 0 and 1 only
        let estimate = mapping.estimate_factors(&data, 3);
        assert_approx_eq!(estimate[0], 2.0);
        assert_approx_eq!(estimate[1], 1.0);

        // Item 0 never counts itself, its only similar trained item is 1
        let estimate = mapping.estimate_factors(&data, 0);
        assert_approx_eq!(estimate[0], 3.0);

        // Unknown entity has no correlations
        assert_eq!(mapping.estimate_factors(&data, 10), vec![0.0, 0.0]);
    }
}
