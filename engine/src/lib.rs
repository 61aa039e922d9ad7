// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod baseline;
pub mod correlation;
pub mod error;
pub mod eval;
pub mod factors;
pub mod knn;
pub mod mapping;
pub mod matrix;
pub mod methods;
pub mod scored;

use error::ErrorKind;
use rand::RngCore;
use std::fmt;

pub use eval::EvaluationResult;
pub use matrix::Matrix;
pub use methods::{Method, Model};

pub type Result<T> = std::result::Result<T, ErrorKind>;

/// A model that learns from the training data and scores (user, item)
/// pairs. Scores of unknown users or items are neutral, never an error.
pub trait Recommender: fmt::Display {
    fn train(&mut self, rng: &mut dyn RngCore) -> Result<()>;

    fn predict(&self, user_id: usize, item_id: usize) -> f64;
}

/// A model trained by repeating a learning pass
pub trait IterativeModel: Recommender {
    fn iterate(&mut self, rng: &mut dyn RngCore) -> Result<()>;

    /// Error of the model on its own training data
    fn compute_fit(&self) -> f64;
}
