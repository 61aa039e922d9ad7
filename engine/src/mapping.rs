// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod knn;
pub mod linear;

use crate::{
    error::ErrorKind,
    factors::bpr::BprMf,
    matrix::Matrix,
    IterativeModel, Recommender, Result,
};
use config::{BprConfig, MappingConfig};
use controller::SparseBooleanMatrix;
use rand::RngCore;
use std::{collections::BTreeSet, fmt, str::FromStr};

pub use knn::KnnMapping;
pub use linear::{LinearMapping, Objective};

/// Side of the interaction matrix whose factors are estimated
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Target {
    Users,
    Items,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Users => write!(f, "UserMapping"),
            Target::Items => write!(f, "ItemMapping"),
        }
    }
}

/// Flavors of attribute to factor mappings
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MappingKind {
    /// Squared error between estimated and learned factors
    Linear,
    /// Pairwise ranking loss through the estimated factors
    Optimal,
    /// Squared error of the scores computed with the estimated factors
    Complex,
    /// Weighted average of the factors of attribute-similar entities
    Knn,
    /// Linear regression with an epsilon-insensitive loss
    Svr,
}

impl FromStr for MappingKind {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(MappingKind::Linear),
            "optimal" => Ok(MappingKind::Optimal),
            "complex" => Ok(MappingKind::Complex),
            "knn" => Ok(MappingKind::Knn),
            "svr" => Ok(MappingKind::Svr),
            _ => Err(ErrorKind::UnknownMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MappingKind::Linear => "linear",
            MappingKind::Optimal => "optimal",
            MappingKind::Complex => "complex",
            MappingKind::Knn => "knn",
            MappingKind::Svr => "svr",
        };

        write!(f, "{}", name)
    }
}

/// Everything a mapping learns from, borrowed from the trained model.
///
/// `target_interactions` maps every target entity to the entities of the
/// other side it interacted with, `other_interactions` is its transpose.
pub struct MappingData<'a> {
    pub target: Target,
    pub attributes: &'a SparseBooleanMatrix,
    pub target_factors: &'a Matrix<f64>,
    pub other_factors: &'a Matrix<f64>,
    pub target_interactions: &'a SparseBooleanMatrix,
    pub other_interactions: &'a SparseBooleanMatrix,
    pub trained_targets: &'a [usize],
    pub trained_others: &'a [usize],
}

impl<'a> MappingData<'a> {
    pub fn num_factors(&self) -> usize {
        self.target_factors.num_cols()
    }

    /// Root mean squared difference between estimated and learned factors
    /// over the trained targets
    pub fn factor_rmse<M>(&self, mapping: &M) -> f64
    where
        M: AttributeToFactorMapping + ?Sized,
    {
        let num_factors = self.num_factors();
        if self.trained_targets.is_empty() || num_factors == 0 {
            return 0.0;
        }

        let mut squared = 0.0;
        for &entity_id in self.trained_targets {
            let estimated = mapping.estimate_factors(self, entity_id);
            for (f, value) in estimated.iter().enumerate() {
                let error = value - self.target_factors.get_or_zero(entity_id, f);
                squared += error * error;
            }
        }

        (squared / (self.trained_targets.len() * num_factors) as f64).sqrt()
    }
}

/// Learns a function from binary attributes to latent factors, used to
/// place entities without interactions into a trained factor space
pub trait AttributeToFactorMapping {
    /// Fresh parameters for `data`
    fn init(&mut self, data: &MappingData, rng: &mut dyn RngCore) -> Result<()>;

    /// One pass of the learning procedure
    fn iterate(&mut self, data: &MappingData, rng: &mut dyn RngCore);

    fn num_iter(&self) -> usize;

    fn learn(&mut self, data: &MappingData, rng: &mut dyn RngCore) -> Result<()> {
        self.init(data, rng)?;
        for _ in 0..self.num_iter() {
            self.iterate(data, rng);
        }

        Ok(())
    }

    fn compute_fit(&self, data: &MappingData) -> f64 {
        data.factor_rmse(self)
    }

    fn estimate_factors(&self, data: &MappingData, entity_id: usize) -> Vec<f64>;
}

/// The closed set of mappings a run can use
pub enum Mapper {
    Linear(LinearMapping),
    Knn(KnnMapping),
}

impl Mapper {
    pub fn new(kind: MappingKind, params: &MappingConfig) -> Self {
        let linear = |objective| Mapper::Linear(LinearMapping::new(objective, params));

        match kind {
            MappingKind::Linear => linear(Objective::SquaredError),
            MappingKind::Optimal => linear(Objective::Ranking),
            MappingKind::Complex => linear(Objective::ScoreSpace),
            MappingKind::Svr => linear(Objective::EpsilonInsensitive(params.epsilon)),
            MappingKind::Knn => Mapper::Knn(KnnMapping::new(params.k)),
        }
    }
}

impl AttributeToFactorMapping for Mapper {
    fn init(&mut self, data: &MappingData, rng: &mut dyn RngCore) -> Result<()> {
        match self {
            Mapper::Linear(mapping) => mapping.init(data, rng),
            Mapper::Knn(mapping) => mapping.init(data, rng),
        }
    }

    fn iterate(&mut self, data: &MappingData, rng: &mut dyn RngCore) {
        match self {
            Mapper::Linear(mapping) => mapping.iterate(data, rng),
            Mapper::Knn(mapping) => mapping.iterate(data, rng),
        }
    }

    fn num_iter(&self) -> usize {
        match self {
            Mapper::Linear(mapping) => mapping.num_iter(),
            Mapper::Knn(mapping) => mapping.num_iter(),
        }
    }

    fn compute_fit(&self, data: &MappingData) -> f64 {
        match self {
            Mapper::Linear(mapping) => mapping.compute_fit(data),
            Mapper::Knn(mapping) => mapping.compute_fit(data),
        }
    }

    fn estimate_factors(&self, data: &MappingData, entity_id: usize) -> Vec<f64> {
        match self {
            Mapper::Linear(mapping) => mapping.estimate_factors(data, entity_id),
            Mapper::Knn(mapping) => mapping.estimate_factors(data, entity_id),
        }
    }
}

/// BPR-MF whose users or items without training interactions get factors
/// estimated from their attributes
pub struct MappedRecommender {
    target: Target,
    kind: MappingKind,
    params: MappingConfig,
    bpr: BprMf,
    mapper: Mapper,
    attributes: SparseBooleanMatrix,
    data_item: SparseBooleanMatrix,
    log_fit: bool,
}

impl MappedRecommender {
    /// `num_users` and `num_items` cover every entity that may be asked
    /// for, including the ones only present in the test data
    pub fn new(
        target: Target,
        kind: MappingKind,
        bpr_params: &BprConfig,
        params: &MappingConfig,
        data_user: SparseBooleanMatrix,
        attributes: SparseBooleanMatrix,
        num_users: usize,
        num_items: usize,
    ) -> Self {
        let data_item = data_user.transpose();

        let mut bpr = BprMf::new(bpr_params, data_user);
        bpr.set_num_users(num_users);
        bpr.set_num_items(num_items);

        Self {
            target,
            kind,
            params: params.clone(),
            bpr,
            mapper: Mapper::new(kind, params),
            attributes,
            data_item,
            log_fit: false,
        }
    }

    /// Logs the mapping fit every `compute_fit_every` iterations
    pub fn with_fit_logging(mut self, log_fit: bool) -> Self {
        self.log_fit = log_fit;
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn bpr(&self) -> &BprMf {
        &self.bpr
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Fit of the mapping on the trained targets
    pub fn compute_fit(&self) -> f64 {
        let data = mapping_data(self.target, &self.bpr, &self.attributes, &self.data_item);
        self.mapper.compute_fit(&data)
    }

    pub fn learn_mapping(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        let data = mapping_data(self.target, &self.bpr, &self.attributes, &self.data_item);

        self.mapper.init(&data, rng)?;
        if self.log_fit {
            log::info!("mapping iteration -1 fit {:.5}", self.mapper.compute_fit(&data));
        }

        let every = self.params.compute_fit_every.max(1);
        for iteration in 0..self.mapper.num_iter() {
            self.mapper.iterate(&data, rng);

            if self.log_fit && (iteration + 1) % every == 0 {
                log::info!(
                    "mapping iteration {} fit {:.5}",
                    iteration,
                    self.mapper.compute_fit(&data)
                );
            }
        }

        Ok(())
    }

    /// Replaces the factors of every target without training interactions
    /// by their estimate, returns how many were replaced
    pub fn substitute_cold_factors(&mut self) -> usize {
        let estimates: Vec<(usize, Vec<f64>)> = {
            let data = mapping_data(self.target, &self.bpr, &self.attributes, &self.data_item);
            let trained: BTreeSet<usize> = data.trained_targets.iter().copied().collect();

            (0..data.target_factors.num_rows())
                .filter(|entity_id| !trained.contains(entity_id))
                .map(|entity_id| (entity_id, self.mapper.estimate_factors(&data, entity_id)))
                .collect()
        };

        for (entity_id, factors) in &estimates {
            match self.target {
                Target::Users => self.bpr.set_user_factors(*entity_id, factors),
                Target::Items => self.bpr.set_item_factors(*entity_id, factors),
            }
        }

        estimates.len()
    }
}

fn mapping_data<'a>(
    target: Target,
    bpr: &'a BprMf,
    attributes: &'a SparseBooleanMatrix,
    data_item: &'a SparseBooleanMatrix,
) -> MappingData<'a> {
    match target {
        Target::Items => MappingData {
            target,
            attributes,
            target_factors: bpr.item_factors(),
            other_factors: bpr.user_factors(),
            target_interactions: data_item,
            other_interactions: bpr.data_user(),
            trained_targets: bpr.trained_items(),
            trained_others: bpr.trained_users(),
        },
        Target::Users => MappingData {
            target,
            attributes,
            target_factors: bpr.user_factors(),
            other_factors: bpr.item_factors(),
            target_interactions: bpr.data_user(),
            other_interactions: data_item,
            trained_targets: bpr.trained_users(),
            trained_others: bpr.trained_items(),
        },
    }
}

impl Recommender for MappedRecommender {
    fn train(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        self.bpr.train(rng)?;
        log::info!("BPR-MF fit {:.5}", self.bpr.compute_fit());

        self.learn_mapping(rng)?;

        let substituted = self.substitute_cold_factors();
        log::info!("Estimated factors for {} cold entities", substituted);

        Ok(())
    }

    fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        self.bpr.predict(user_id, item_id)
    }
}

impl fmt::Display for MappedRecommender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{} reg_mapping={} num_iter_mapping={} learn_rate_mapping={} over {}",
            self.target,
            self.kind,
            self.params.regularization,
            self.params.num_iter,
            self.params.learn_rate,
            self.bpr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    /// Items 0..8 are liked by users sharing their attribute, item 8 has the
    /// attribute of the even items but no interactions
    fn scenario() -> (SparseBooleanMatrix, SparseBooleanMatrix) {
        let mut data_user = SparseBooleanMatrix::new();
        for u in 0..8 {
            for i in 0..8 {
                if i % 2 == u % 2 && (u + i) % 3 != 0 {
                    data_user.set(u, i, true);
                }
            }
        }

        let mut attributes = SparseBooleanMatrix::new();
        for i in 0..9 {
            attributes.set(i, i % 2, true);
            attributes.set(i, 2, true);
        }

        (data_user, attributes)
    }

    fn recommender(kind: MappingKind) -> MappedRecommender {
        let (data_user, attributes) = scenario();
        let bpr = BprConfig {
            num_iter: 50,
            ..BprConfig::default()
        };
        let params = MappingConfig {
            num_iter: 30,
            k: 3,
            ..MappingConfig::default()
        };

        MappedRecommender::new(Target::Items, kind, &bpr, &params, data_user, attributes, 8, 9)
    }

    #[test]
    fn kinds_parse_from_names() {
        for kind in &[
            MappingKind::Linear,
            MappingKind::Optimal,
            MappingKind::Complex,
            MappingKind::Knn,
            MappingKind::Svr,
        ] {
            assert_eq!(kind.to_string().parse::<MappingKind>(), Ok(*kind));
        }

        assert!("cubic".parse::<MappingKind>().is_err());
    }

    #[test]
    fn cold_items_get_estimated_factors() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut mapped = recommender(MappingKind::Linear);

        mapped.train(&mut rng).unwrap();

        let data = mapping_data(mapped.target, &mapped.bpr, &mapped.attributes, &mapped.data_item);
        let estimate = mapped.mapper.estimate_factors(&data, 8);
        assert_eq!(mapped.bpr().item_factors().row(8), estimate.as_slice());
    }

    #[test]
    fn trained_items_keep_their_factors() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut mapped = recommender(MappingKind::Knn);

        mapped.bpr.train(&mut rng).unwrap();
        let before = mapped.bpr().item_factors().row(0).to_vec();

        mapped.learn_mapping(&mut rng).unwrap();
        assert_eq!(mapped.substitute_cold_factors(), 1);
        assert_eq!(mapped.bpr().item_factors().row(0), before.as_slice());
    }

    #[test]
    fn user_target_swaps_sides() {
        let (data_user, _) = scenario();
        let mut user_attributes = SparseBooleanMatrix::new();
        for u in 0..9 {
            user_attributes.set(u, u % 2, true);
        }

        let mut mapped = MappedRecommender::new(
            Target::Users,
            MappingKind::Optimal,
            &BprConfig::default(),
            &MappingConfig::default(),
            data_user,
            user_attributes,
            9,
            8,
        );

        let mut rng = StdRng::seed_from_u64(4);
        mapped.train(&mut rng).unwrap();

        assert_eq!(mapped.bpr().user_factors().num_rows(), 9);
        assert!(mapped.predict(8, 0).is_finite());
    }
}
