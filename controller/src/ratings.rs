// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::sparse::SparseBooleanMatrix;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingEvent {
    pub user_id: usize,
    pub item_id: usize,
    pub rating: f64,
    pub timestamp: Option<i64>,
}

impl RatingEvent {
    pub fn new(user_id: usize, item_id: usize, rating: f64) -> Self {
        Self {
            user_id,
            item_id,
            rating,
            timestamp: None,
        }
    }
}

/// Rating events in insertion order, indexed by user and by item.
///
/// A (user, item) pair holds at most one event, adding it again replaces the
/// stored value in place.
#[derive(Debug, Clone, Default)]
pub struct Ratings {
    events: Vec<RatingEvent>,
    by_user: Vec<Vec<usize>>,
    by_item: Vec<Vec<usize>>,
    index: HashMap<(usize, usize), usize>,
}

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: RatingEvent) {
        let key = (event.user_id, event.item_id);
        if let Some(&position) = self.index.get(&key) {
            self.events[position] = event;
            return;
        }

        let position = self.events.len();
        self.events.push(event);
        self.index.insert(key, position);

        if event.user_id >= self.by_user.len() {
            self.by_user.resize_with(event.user_id + 1, Vec::new);
        }
        if event.item_id >= self.by_item.len() {
            self.by_item.resize_with(event.item_id + 1, Vec::new);
        }

        self.by_user[event.user_id].push(position);
        self.by_item[event.item_id].push(position);
    }

    pub fn all(&self) -> &[RatingEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// MaxUserID + 1
    pub fn num_users(&self) -> usize {
        self.by_user.len()
    }

    /// MaxItemID + 1
    pub fn num_items(&self) -> usize {
        self.by_item.len()
    }

    pub fn max_user_id(&self) -> Option<usize> {
        self.num_users().checked_sub(1)
    }

    pub fn max_item_id(&self) -> Option<usize> {
        self.num_items().checked_sub(1)
    }

    pub fn get(&self, user_id: usize, item_id: usize) -> Option<f64> {
        self.index
            .get(&(user_id, item_id))
            .map(|&position| self.events[position].rating)
    }

    pub fn by_user(&self, user_id: usize) -> impl Iterator<Item = &RatingEvent> + '_ {
        self.by_user
            .get(user_id)
            .into_iter()
            .flatten()
            .map(move |&position| &self.events[position])
    }

    pub fn by_item(&self, item_id: usize) -> impl Iterator<Item = &RatingEvent> + '_ {
        self.by_item
            .get(item_id)
            .into_iter()
            .flatten()
            .map(move |&position| &self.events[position])
    }

    pub fn count_by_user(&self, user_id: usize) -> usize {
        self.by_user.get(user_id).map(Vec::len).unwrap_or(0)
    }

    pub fn count_by_item(&self, item_id: usize) -> usize {
        self.by_item.get(item_id).map(Vec::len).unwrap_or(0)
    }

    pub fn average(&self) -> Option<f64> {
        if self.events.is_empty() {
            None
        } else {
            let sum: f64 = self.events.iter().map(|event| event.rating).sum();
            Some(sum / self.events.len() as f64)
        }
    }

    /// Boolean user → items projection
    pub fn user_items(&self) -> SparseBooleanMatrix {
        let mut matrix = SparseBooleanMatrix::with_rows(self.num_users());
        for event in &self.events {
            matrix.set(event.user_id, event.item_id, true);
        }

        matrix
    }

    /// Boolean item → users projection
    pub fn item_users(&self) -> SparseBooleanMatrix {
        let mut matrix = SparseBooleanMatrix::with_rows(self.num_items());
        for event in &self.events {
            matrix.set(event.item_id, event.user_id, true);
        }

        matrix
    }
}

impl std::iter::FromIterator<RatingEvent> for Ratings {
    fn from_iter<T: IntoIterator<Item = RatingEvent>>(iter: T) -> Self {
        let mut ratings = Ratings::new();
        for event in iter {
            ratings.add(event);
        }

        ratings
    }
}

impl std::iter::FromIterator<(usize, usize, f64)> for Ratings {
    fn from_iter<T: IntoIterator<Item = (usize, usize, f64)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(user_id, item_id, rating)| RatingEvent::new(user_id, item_id, rating))
            .collect()
    }
}
