// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use std::{cmp::Ordering, cmp::Reverse, collections::BinaryHeap};

type MinHeap<T> = BinaryHeap<Reverse<T>>;

/// An entity ID paired with a score.
///
/// Ordered by score first, a higher score is greater, ties are broken in
/// favor of the lower ID so the greatest element is always deterministic.
#[derive(Debug, Clone, Copy)]
pub struct ScoredId(pub usize, pub f64);

impl ScoredId {
    pub fn id(&self) -> usize {
        self.0
    }

    pub fn score(&self) -> f64 {
        self.1
    }
}

impl PartialEq for ScoredId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredId {}

impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score()
            .partial_cmp(&other.score())
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id().cmp(&self.id()))
    }
}

/// Keeps the `k` greatest scored IDs seen so far
pub struct TopK {
    k: Option<usize>,
    min_heap: MinHeap<ScoredId>,
}

impl TopK {
    /// `None` keeps every pushed element
    pub fn new(k: Option<usize>) -> Self {
        Self {
            k,
            min_heap: Default::default(),
        }
    }

    pub fn push(&mut self, scored: ScoredId) {
        match self.k {
            Some(0) => {}
            Some(k) if self.min_heap.len() >= k => {
                let replace = match self.min_heap.peek() {
                    Some(Reverse(minimum)) => scored > *minimum,
                    None => true,
                };

                if replace {
                    self.min_heap.pop();
                    self.min_heap.push(Reverse(scored));
                }
            }
            _ => self.min_heap.push(Reverse(scored)),
        }
    }

    pub fn len(&self) -> usize {
        self.min_heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.min_heap.is_empty()
    }

    /// Elements from greatest to smallest
    pub fn into_sorted_vec(self) -> Vec<ScoredId> {
        self.min_heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| r.0)
            .collect()
    }
}

impl Extend<ScoredId> for TopK {
    fn extend<T: IntoIterator<Item = ScoredId>>(&mut self, iter: T) {
        for scored in iter {
            self.push(scored);
        }
    }
}

/// Sorts by score descending, lower ID first on ties
pub fn rank(scored: &mut [ScoredId]) {
    scored.sort_unstable_by(|a, b| b.cmp(a));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(scored: &[ScoredId]) -> Vec<usize> {
        scored.iter().map(ScoredId::id).collect()
    }

    #[test]
    fn keeps_greatest_k() {
        let mut top = TopK::new(Some(2));
        top.extend(vec![
            ScoredId(0, 0.1),
            ScoredId(1, 0.9),
            ScoredId(2, 0.5),
            ScoredId(3, 0.7),
        ]);

        assert_eq!(top.len(), 2);
        assert_eq!(ids(&top.into_sorted_vec()), vec![1, 3]);
    }

    #[test]
    fn ties_prefer_lower_id() {
        let mut top = TopK::new(Some(2));
        top.extend(vec![ScoredId(5, 1.0), ScoredId(2, 1.0), ScoredId(9, 1.0)]);

        assert_eq!(ids(&top.into_sorted_vec()), vec![2, 5]);
    }

    #[test]
    fn unbounded_keeps_all() {
        let mut top = TopK::new(None);
        top.extend((0..10).map(|id| ScoredId(id, id as f64)));

        let sorted = top.into_sorted_vec();
        assert_eq!(sorted.len(), 10);
        assert_eq!(sorted[0].id(), 9);
    }

    #[test]
    fn zero_keeps_nothing() {
        let mut top = TopK::new(Some(0));
        top.push(ScoredId(0, 1.0));
        assert!(top.is_empty());
    }

    #[test]
    fn rank_sorts_descending() {
        let mut scored = vec![ScoredId(3, 0.2), ScoredId(1, 0.8), ScoredId(0, 0.2)];
        rank(&mut scored);

        assert_eq!(ids(&scored), vec![1, 0, 3]);
    }
}
