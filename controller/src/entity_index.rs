// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use std::collections::HashMap;

/// Maps external entity tokens to dense internal IDs starting at zero
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    to_internal: HashMap<String, usize>,
    to_original: Vec<String>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the internal ID for `token`, assigning the next free one on
    /// first sight
    pub fn to_internal_id(&mut self, token: &str) -> usize {
        if let Some(&id) = self.to_internal.get(token) {
            return id;
        }

        let id = self.to_original.len();
        self.to_internal.insert(token.to_owned(), id);
        self.to_original.push(token.to_owned());
        id
    }

    pub fn find_internal_id(&self, token: &str) -> Option<usize> {
        self.to_internal.get(token).copied()
    }

    pub fn to_original_id(&self, id: usize) -> Option<&str> {
        self.to_original.get(id).map(String::as_str)
    }

    pub fn internal_ids(&self) -> std::ops::Range<usize> {
        0..self.to_original.len()
    }

    pub fn max_internal_id(&self) -> Option<usize> {
        self.to_original.len().checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.to_original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_original.is_empty()
    }
}
