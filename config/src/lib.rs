// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use anyhow::Error;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error as DError;

#[derive(Debug, Clone, DError, PartialEq)]
pub enum ConfigError {
    #[error("Rating range is empty: min_rating({0}) must be lower than max_rating({1})")]
    EmptyRatingRange(f64, f64),

    #[error("Parameter '{0}' must be non-negative, got {1}")]
    Negative(&'static str, f64),

    #[error("Parameter '{0}' must be greater than zero")]
    Zero(&'static str),

    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub delimiter: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            delimiter: "\t".into(),
        }
    }
}

impl DataConfig {
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::InvalidDelimiter(self.delimiter.clone())),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RatingsConfig {
    pub min_rating: f64,
    pub max_rating: f64,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            min_rating: 1.0,
            max_rating: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LatentFactorsConfig {
    pub num_factors: usize,
    pub regularization: f64,
    pub learn_rate: f64,
    pub num_iter: usize,
    pub init_mean: f64,
    pub init_stdev: f64,
}

impl Default for LatentFactorsConfig {
    fn default() -> Self {
        Self {
            num_factors: 10,
            regularization: 0.015,
            learn_rate: 0.01,
            num_iter: 30,
            init_mean: 0.0,
            init_stdev: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SocialConfig {
    pub social_regularization: f64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            social_regularization: 1.0,
        }
    }
}

/// Neighborhood settings, `k` left out means every neighbor is used
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnnConfig {
    pub k: Option<usize>,
    pub reg_u: f64,
    pub reg_i: f64,
    pub update_users: bool,
    pub update_items: bool,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: None,
            reg_u: 10.0,
            reg_i: 5.0,
            update_users: true,
            update_items: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BprConfig {
    pub num_factors: usize,
    pub num_iter: usize,
    pub learn_rate: f64,
    pub reg_u: f64,
    pub reg_i: f64,
    pub reg_j: f64,
    pub bias_reg: f64,
    pub init_mean: f64,
    pub init_stdev: f64,
}

impl Default for BprConfig {
    fn default() -> Self {
        Self {
            num_factors: 10,
            num_iter: 30,
            learn_rate: 0.05,
            reg_u: 0.0025,
            reg_i: 0.0025,
            reg_j: 0.00025,
            bias_reg: 0.0,
            init_mean: 0.0,
            init_stdev: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MappingConfig {
    pub num_iter: usize,
    pub learn_rate: f64,
    pub regularization: f64,
    pub init_mean: f64,
    pub init_stdev: f64,
    pub k: usize,
    pub epsilon: f64,
    pub compute_fit_every: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            num_iter: 10,
            learn_rate: 0.01,
            regularization: 0.1,
            init_mean: 0.0,
            init_stdev: 0.1,
            k: 20,
            epsilon: 0.1,
            compute_fit_every: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub ratings: RatingsConfig,
    pub latent_factors: LatentFactorsConfig,
    pub social: SocialConfig,
    pub knn: KnnConfig,
    pub bpr: BprConfig,
    pub mapping: MappingConfig,
    pub general: GeneralConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let parsed: Self = toml::from_str(&contents)?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.data.delimiter_byte()?;

        let RatingsConfig {
            min_rating,
            max_rating,
        } = self.ratings;
        if !(min_rating < max_rating) {
            return Err(ConfigError::EmptyRatingRange(min_rating, max_rating));
        }

        if self.latent_factors.num_factors == 0 {
            return Err(ConfigError::Zero("latent_factors.num_factors"));
        }
        if self.bpr.num_factors == 0 {
            return Err(ConfigError::Zero("bpr.num_factors"));
        }
        if self.knn.k == Some(0) {
            return Err(ConfigError::Zero("knn.k"));
        }
        if self.mapping.k == 0 {
            return Err(ConfigError::Zero("mapping.k"));
        }
        if self.mapping.compute_fit_every == 0 {
            return Err(ConfigError::Zero("mapping.compute_fit_every"));
        }

        let non_negative = [
            ("latent_factors.regularization", self.latent_factors.regularization),
            ("latent_factors.learn_rate", self.latent_factors.learn_rate),
            ("latent_factors.init_stdev", self.latent_factors.init_stdev),
            ("social.social_regularization", self.social.social_regularization),
            ("knn.reg_u", self.knn.reg_u),
            ("knn.reg_i", self.knn.reg_i),
            ("bpr.learn_rate", self.bpr.learn_rate),
            ("bpr.reg_u", self.bpr.reg_u),
            ("bpr.reg_i", self.bpr.reg_i),
            ("bpr.reg_j", self.bpr.reg_j),
            ("bpr.bias_reg", self.bpr.bias_reg),
            ("bpr.init_stdev", self.bpr.init_stdev),
            ("mapping.learn_rate", self.mapping.learn_rate),
            ("mapping.regularization", self.mapping.regularization),
            ("mapping.init_stdev", self.mapping.init_stdev),
            ("mapping.epsilon", self.mapping.epsilon),
        ];

        for (name, value) in non_negative.iter() {
            if !(*value >= 0.0) {
                return Err(ConfigError::Negative(*name, *value));
            }
        }

        Ok(())
    }
}
