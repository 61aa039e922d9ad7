// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use std::collections::BTreeSet;

/// Row-major sparse boolean matrix, rows grow on demand and are never
/// shrunk. Rows are ordered sets, so iteration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseBooleanMatrix {
    rows: Vec<BTreeSet<usize>>,
}

impl SparseBooleanMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(num_rows: usize) -> Self {
        Self {
            rows: vec![BTreeSet::new(); num_rows],
        }
    }

    pub fn get(&self, row: usize, column: usize) -> bool {
        self.rows
            .get(row)
            .map(|entries| entries.contains(&column))
            .unwrap_or(false)
    }

    /// Sets or clears a cell, returns whether the matrix changed
    pub fn set(&mut self, row: usize, column: usize, value: bool) -> bool {
        if value {
            self.grow_rows(row + 1);
            self.rows[row].insert(column)
        } else {
            match self.rows.get_mut(row) {
                Some(entries) => entries.remove(&column),
                None => false,
            }
        }
    }

    pub fn grow_rows(&mut self, num_rows: usize) {
        if num_rows > self.rows.len() {
            self.rows.resize_with(num_rows, BTreeSet::new);
        }
    }

    pub fn row(&self, row: usize) -> Option<&BTreeSet<usize>> {
        self.rows.get(row)
    }

    pub fn row_iter(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .get(row)
            .into_iter()
            .flat_map(|entries| entries.iter().copied())
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn number_of_rows(&self) -> usize {
        self.rows.len()
    }

    /// One past the highest column ID present in any row
    pub fn number_of_columns(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|entries| entries.iter().next_back())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0)
    }

    pub fn number_of_entries(&self) -> usize {
        self.rows.iter().map(BTreeSet::len).sum()
    }

    pub fn non_empty_row_ids(&self) -> BTreeSet<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(row, _)| row)
            .collect()
    }

    /// Number of columns two rows have in common
    pub fn overlap(&self, row_a: usize, row_b: usize) -> usize {
        match (self.rows.get(row_a), self.rows.get(row_b)) {
            (Some(a), Some(b)) => {
                let (shortest, longest) = if a.len() > b.len() { (b, a) } else { (a, b) };
                shortest.iter().filter(|c| longest.contains(c)).count()
            }
            _ => 0,
        }
    }

    pub fn transpose(&self) -> Self {
        let mut transposed = Self::with_rows(self.number_of_columns());
        for (row, entries) in self.rows.iter().enumerate() {
            for &column in entries {
                transposed.rows[column].insert(row);
            }
        }

        transposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseBooleanMatrix {
        let mut matrix = SparseBooleanMatrix::new();
        matrix.set(0, 1, true);
        matrix.set(0, 3, true);
        matrix.set(2, 3, true);
        matrix
    }

    #[test]
    fn set_grows_rows() {
        let matrix = sample();

        assert_eq!(matrix.number_of_rows(), 3);
        assert_eq!(matrix.number_of_columns(), 4);
        assert_eq!(matrix.number_of_entries(), 3);
        assert!(matrix.get(0, 3));
        assert!(!matrix.get(1, 3));
        assert!(!matrix.get(10, 0));
    }

    #[test]
    fn non_empty_rows_track_entries() {
        let mut matrix = sample();
        let expected: BTreeSet<usize> = [0, 2].iter().copied().collect();
        assert_eq!(matrix.non_empty_row_ids(), expected);

        assert!(matrix.set(2, 3, false));
        assert!(!matrix.set(2, 3, false));
        assert_eq!(matrix.number_of_entries(), 2);
        assert_eq!(matrix.non_empty_row_ids().len(), 1);
    }

    #[test]
    fn overlap_and_transpose() {
        let matrix = sample();
        assert_eq!(matrix.overlap(0, 2), 1);
        assert_eq!(matrix.overlap(0, 7), 0);

        let transposed = matrix.transpose();
        assert_eq!(transposed.number_of_rows(), 4);
        assert_eq!(transposed.row_iter(3).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(transposed.row_len(0), 0);
        assert_eq!(transposed.transpose().number_of_entries(), 3);
    }
}
