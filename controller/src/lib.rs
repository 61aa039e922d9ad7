// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod dataset;
pub mod entity_index;
pub mod error;
pub mod file;
pub mod ratings;
pub mod sparse;
pub mod table;

use anyhow::Error;

pub use dataset::{DataStats, Dataset};
pub use entity_index::EntityIndex;
pub use file::{DataFiles, FileController};
pub use ratings::{RatingEvent, Ratings};
pub use sparse::SparseBooleanMatrix;
pub use table::ToTable;

pub type Result<T> = std::result::Result<T, Error>;

pub trait Controller {
    /// Read every input of a run, mapping external tokens to internal IDs
    fn load(&self) -> Result<Dataset>;
}
