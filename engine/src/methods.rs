// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{
    correlation,
    error::ErrorKind,
    factors::{biased::BiasedMatrixFactorization, bpr::BprMf, social::SocialMf},
    knn::{Knn, Orientation},
    mapping::{MappedRecommender, MappingKind, Target},
    IterativeModel, Recommender, Result,
};
use config::Config;
use controller::Dataset;
use rand::RngCore;
use std::{fmt, str::FromStr};

/// Recommender selected by name on the command line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    Knn(Orientation, correlation::Method),
    BiasedMf,
    SocialMf,
    BprMf,
    Mapping(Target, MappingKind),
}

impl Method {
    /// Every accepted name
    pub const NAMES: [&'static str; 16] = [
        "user-knn",
        "user-knn-cosine",
        "user-knn-jaccard",
        "item-knn",
        "item-knn-cosine",
        "item-knn-jaccard",
        "biased-mf",
        "social-mf",
        "bpr-mf",
        "bpr-mf-item-mapping",
        "bpr-mf-item-mapping-optimal",
        "bpr-mf-item-mapping-complex",
        "bpr-mf-item-mapping-knn",
        "bpr-mf-item-mapping-svr",
        "bpr-mf-user-mapping",
        "bpr-mf-user-mapping-optimal",
    ];

    pub fn needs_user_relation(&self) -> bool {
        matches!(self, Method::SocialMf)
    }

    pub fn needs_item_attributes(&self) -> bool {
        matches!(self, Method::Mapping(Target::Items, _))
    }

    pub fn needs_user_attributes(&self) -> bool {
        matches!(self, Method::Mapping(Target::Users, _))
    }

    /// Whether the model predicts values on the rating scale
    pub fn predicts_ratings(&self) -> bool {
        matches!(self, Method::Knn(..) | Method::BiasedMf | Method::SocialMf)
    }

    /// Fails when `dataset` lacks an input the method depends on
    pub fn check(&self, dataset: &Dataset) -> Result<()> {
        if self.needs_user_relation() && dataset.user_relation.is_none() {
            return Err(ErrorKind::MissingUserRelation(self.to_string()));
        }

        if self.needs_item_attributes() && dataset.item_attributes.is_none() {
            return Err(ErrorKind::MissingAttributes(self.to_string(), "item"));
        }

        if self.needs_user_attributes() && dataset.user_attributes.is_none() {
            return Err(ErrorKind::MissingAttributes(self.to_string(), "user"));
        }

        Ok(())
    }

    /// Untrained model for `dataset`, sized to every known user and item
    pub fn build(&self, config: &Config, dataset: &Dataset) -> Result<Model> {
        self.check(dataset)?;

        let training = dataset.training.clone();
        let num_users = dataset.num_users();
        let num_items = dataset.num_items();

        let model = match *self {
            Method::Knn(orientation, method) => {
                Model::Knn(Knn::new(orientation, method, &config.knn, &config.ratings, training))
            }
            Method::BiasedMf => {
                let mut mf =
                    BiasedMatrixFactorization::new(&config.latent_factors, &config.ratings, training)?;
                mf.set_num_users(num_users);
                mf.set_num_items(num_items);
                Model::BiasedMf(mf)
            }
            Method::SocialMf => {
                let relation = dataset.user_relation.clone().unwrap_or_default();
                let mut mf = SocialMf::new(
                    &config.latent_factors,
                    &config.social,
                    &config.ratings,
                    training,
                    relation,
                )?;
                mf.set_num_users(num_users);
                mf.set_num_items(num_items);
                Model::SocialMf(mf)
            }
            Method::BprMf => {
                let mut bpr = BprMf::new(&config.bpr, training.user_items());
                bpr.set_num_users(num_users);
                bpr.set_num_items(num_items);
                Model::BprMf(bpr)
            }
            Method::Mapping(target, kind) => {
                let attributes = match target {
                    Target::Items => dataset.item_attributes.clone(),
                    Target::Users => dataset.user_attributes.clone(),
                };

                Model::Mapped(MappedRecommender::new(
                    target,
                    kind,
                    &config.bpr,
                    &config.mapping,
                    training.user_items(),
                    attributes.unwrap_or_default(),
                    num_users,
                    num_items,
                ))
            }
        };

        Ok(model)
    }
}

impl FromStr for Method {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self> {
        let method = match s.to_ascii_lowercase().as_str() {
            "user-knn" | "user-knn-cosine" => Method::Knn(Orientation::Users, correlation::Method::Cosine),
            "user-knn-jaccard" => Method::Knn(Orientation::Users, correlation::Method::Jaccard),
            "item-knn" | "item-knn-cosine" => Method::Knn(Orientation::Items, correlation::Method::Cosine),
            "item-knn-jaccard" => Method::Knn(Orientation::Items, correlation::Method::Jaccard),
            "biased-mf" => Method::BiasedMf,
            "social-mf" => Method::SocialMf,
            "bpr-mf" => Method::BprMf,
            "bpr-mf-item-mapping" => Method::Mapping(Target::Items, MappingKind::Linear),
            "bpr-mf-item-mapping-optimal" => Method::Mapping(Target::Items, MappingKind::Optimal),
            "bpr-mf-item-mapping-complex" => Method::Mapping(Target::Items, MappingKind::Complex),
            "bpr-mf-item-mapping-knn" => Method::Mapping(Target::Items, MappingKind::Knn),
            "bpr-mf-item-mapping-svr" => Method::Mapping(Target::Items, MappingKind::Svr),
            "bpr-mf-user-mapping" => Method::Mapping(Target::Users, MappingKind::Linear),
            "bpr-mf-user-mapping-optimal" => Method::Mapping(Target::Users, MappingKind::Optimal),
            _ => return Err(ErrorKind::UnknownMethod(s.to_owned())),
        };

        Ok(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Method::Knn(Orientation::Users, method) => write!(f, "user-knn-{}", method),
            Method::Knn(Orientation::Items, method) => write!(f, "item-knn-{}", method),
            Method::BiasedMf => write!(f, "biased-mf"),
            Method::SocialMf => write!(f, "social-mf"),
            Method::BprMf => write!(f, "bpr-mf"),
            Method::Mapping(target, kind) => {
                let side = match target {
                    Target::Items => "item",
                    Target::Users => "user",
                };

                match kind {
                    MappingKind::Linear => write!(f, "bpr-mf-{}-mapping", side),
                    kind => write!(f, "bpr-mf-{}-mapping-{}", side, kind),
                }
            }
        }
    }
}

/// A built recommender, one variant per family
pub enum Model {
    Knn(Knn),
    BiasedMf(BiasedMatrixFactorization),
    SocialMf(SocialMf),
    BprMf(BprMf),
    Mapped(MappedRecommender),
}

impl Model {
    pub fn as_recommender(&self) -> &dyn Recommender {
        match self {
            Model::Knn(model) => model,
            Model::BiasedMf(model) => model,
            Model::SocialMf(model) => model,
            Model::BprMf(model) => model,
            Model::Mapped(model) => model,
        }
    }

    fn as_recommender_mut(&mut self) -> &mut dyn Recommender {
        match self {
            Model::Knn(model) => model,
            Model::BiasedMf(model) => model,
            Model::SocialMf(model) => model,
            Model::BprMf(model) => model,
            Model::Mapped(model) => model,
        }
    }

    /// Training fit of the model, `None` for memory based models
    pub fn compute_fit(&self) -> Option<f64> {
        match self {
            Model::Knn(_) => None,
            Model::BiasedMf(model) => Some(model.compute_fit()),
            Model::SocialMf(model) => Some(model.compute_fit()),
            Model::BprMf(model) => Some(model.compute_fit()),
            Model::Mapped(model) => Some(model.compute_fit()),
        }
    }

    pub fn with_fit_logging(self, log_fit: bool) -> Self {
        match self {
            Model::Mapped(model) => Model::Mapped(model.with_fit_logging(log_fit)),
            model => model,
        }
    }
}

impl Recommender for Model {
    fn train(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        self.as_recommender_mut().train(rng)
    }

    fn predict(&self, user_id: usize, item_id: usize) -> f64 {
        self.as_recommender().predict(user_id, item_id)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_recommender())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller::Ratings;
    use rand::{rngs::StdRng, SeedableRng};

    fn dataset() -> Dataset {
        let training: Ratings = vec![
            (0, 0, 5.0),
            (0, 1, 1.0),
            (1, 1, 5.0),
            (1, 2, 1.0),
            (2, 0, 5.0),
            (2, 2, 1.0),
        ]
        .into_iter()
        .collect();

        Dataset {
            training,
            ..Dataset::default()
        }
    }

    #[test]
    fn every_name_parses_back() {
        for name in &Method::NAMES {
            let method: Method = name.parse().unwrap();
            let reparsed: Method = method.to_string().parse().unwrap();
            assert_eq!(method, reparsed);
        }
    }

    #[test]
    fn unknown_name_fails() {
        assert_eq!(
            "slope-one".parse::<Method>(),
            Err(ErrorKind::UnknownMethod("slope-one".into()))
        );
    }

    #[test]
    fn capabilities_are_checked_before_building() {
        let dataset = dataset();
        let config = Config::default();

        let social: Method = "social-mf".parse().unwrap();
        assert_eq!(
            social.build(&config, &dataset).err(),
            Some(ErrorKind::MissingUserRelation("social-mf".into()))
        );

        let mapping: Method = "bpr-mf-item-mapping-svr".parse().unwrap();
        assert_eq!(
            mapping.check(&dataset),
            Err(ErrorKind::MissingAttributes("bpr-mf-item-mapping-svr".into(), "item"))
        );

        let mapping: Method = "bpr-mf-user-mapping".parse().unwrap();
        assert!(mapping.needs_user_attributes());
        assert!(mapping.check(&dataset).is_err());
    }

    #[test]
    fn built_models_train_and_predict() {
        let dataset = dataset();
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(9);

        for name in &["user-knn", "item-knn-jaccard", "biased-mf", "bpr-mf"] {
            let method: Method = name.parse().unwrap();
            let mut model = method.build(&config, &dataset).unwrap();
            model.train(&mut rng).unwrap();

            assert!(model.predict(0, 2).is_finite(), "{}", model);
            assert_eq!(model.compute_fit().is_some(), !matches!(method, Method::Knn(..)));
        }
    }
}
