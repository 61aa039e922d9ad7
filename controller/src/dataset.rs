// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{entity_index::EntityIndex, ratings::Ratings, sparse::SparseBooleanMatrix};
use std::collections::BTreeSet;

/// Everything a single run works on, all IDs resolved through the same
/// user and item indices
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: EntityIndex,
    pub items: EntityIndex,
    pub training: Ratings,
    pub test: Ratings,
    pub user_attributes: Option<SparseBooleanMatrix>,
    pub item_attributes: Option<SparseBooleanMatrix>,
    pub user_relation: Option<SparseBooleanMatrix>,
    pub relevant_items: Option<BTreeSet<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataStats {
    pub num_users: usize,
    pub num_items: usize,
    pub num_entries: usize,
    pub sparsity: f64,
}

impl DataStats {
    pub fn of(ratings: &Ratings) -> Self {
        let num_users = ratings.user_items().non_empty_row_ids().len();
        let num_items = ratings.item_users().non_empty_row_ids().len();
        let num_entries = ratings.len();

        let matrix_size = num_users as f64 * num_items as f64;
        let sparsity = if matrix_size > 0.0 {
            100.0 * (matrix_size - num_entries as f64) / matrix_size
        } else {
            100.0
        };

        Self {
            num_users,
            num_items,
            num_entries,
            sparsity,
        }
    }
}

impl Dataset {
    /// Relevant items for evaluation, the items seen in training unless an
    /// explicit set was supplied
    pub fn relevant_items(&self) -> BTreeSet<usize> {
        match &self.relevant_items {
            Some(items) => items.clone(),
            None => self.training.item_users().non_empty_row_ids(),
        }
    }

    pub fn num_users(&self) -> usize {
        self.users
            .len()
            .max(self.training.num_users())
            .max(self.test.num_users())
    }

    pub fn num_items(&self) -> usize {
        self.items
            .len()
            .max(self.training.num_items())
            .max(self.test.num_items())
    }
}
