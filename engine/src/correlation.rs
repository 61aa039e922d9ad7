// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::scored::{ScoredId, TopK};
use controller::SparseBooleanMatrix;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Method {
    Cosine,
    Jaccard,
}

impl Method {
    /// Correlation between two rows of a boolean matrix, zero whenever the
    /// rows share nothing or one of them is empty
    pub fn compute(self, matrix: &SparseBooleanMatrix, row_a: usize, row_b: usize) -> f64 {
        match self {
            Method::Cosine => cosine(matrix, row_a, row_b),
            Method::Jaccard => jaccard(matrix, row_a, row_b),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Method::Cosine),
            "jaccard" => Ok(Method::Jaccard),
            other => Err(format!("unknown correlation '{}'", other)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Method::Cosine => write!(f, "cosine"),
            Method::Jaccard => write!(f, "jaccard"),
        }
    }
}

pub fn cosine(matrix: &SparseBooleanMatrix, row_a: usize, row_b: usize) -> f64 {
    let len_a = matrix.row_len(row_a);
    let len_b = matrix.row_len(row_b);

    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let overlap = matrix.overlap(row_a, row_b);
    overlap as f64 / ((len_a as f64) * (len_b as f64)).sqrt()
}

pub fn jaccard(matrix: &SparseBooleanMatrix, row_a: usize, row_b: usize) -> f64 {
    let overlap = matrix.overlap(row_a, row_b);
    let union = matrix.row_len(row_a) + matrix.row_len(row_b) - overlap;

    if union == 0 {
        return 0.0;
    }

    overlap as f64 / union as f64
}

/// Dense symmetric matrix of pairwise correlations between the rows of a
/// boolean matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    size: usize,
    method: Method,
    data: Vec<f64>,
}

impl CorrelationMatrix {
    pub fn new(size: usize, method: Method) -> Self {
        Self {
            size,
            method,
            data: vec![0.0; size * size],
        }
    }

    /// Computes every pair of rows in `0..matrix.number_of_rows()`
    pub fn create(matrix: &SparseBooleanMatrix, method: Method) -> Self {
        let size = matrix.number_of_rows();
        let mut correlation = Self::new(size, method);

        log::debug!("Computing {} correlation for {} rows", method, size);
        for a in 0..size {
            if matrix.row_len(a) == 0 {
                continue;
            }

            for b in a..size {
                let value = method.compute(matrix, a, b);
                if value != 0.0 {
                    correlation.set(a, b, value);
                }
            }
        }

        correlation
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn compute_correlation(&self, matrix: &SparseBooleanMatrix, row_a: usize, row_b: usize) -> f64 {
        self.method.compute(matrix, row_a, row_b)
    }

    pub fn get(&self, a: usize, b: usize) -> f64 {
        if a < self.size && b < self.size {
            self.data[a * self.size + b]
        } else {
            0.0
        }
    }

    /// Writes both `[a, b]` and `[b, a]`, growing the matrix if needed
    pub fn set(&mut self, a: usize, b: usize, value: f64) {
        self.grow(a.max(b) + 1);
        self.data[a * self.size + b] = value;
        self.data[b * self.size + a] = value;
    }

    pub fn grow(&mut self, size: usize) {
        if size <= self.size {
            return;
        }

        let mut data = vec![0.0; size * size];
        for a in 0..self.size {
            let old = &self.data[a * self.size..(a + 1) * self.size];
            data[a * size..a * size + self.size].copy_from_slice(old);
        }

        self.data = data;
        self.size = size;
    }

    /// Recomputes the correlations of `row` against every known row in place
    pub fn update_row(&mut self, matrix: &SparseBooleanMatrix, row: usize) {
        self.grow(matrix.number_of_rows().max(row + 1));

        for other in 0..self.size {
            let value = self.method.compute(matrix, row, other);
            self.set(row, other, value);
        }
    }

    /// The `k` candidates most correlated with `row`, excluding `row`
    /// itself, highest first and lower IDs first on ties. `None` returns
    /// every candidate.
    pub fn neighbors<I>(&self, row: usize, candidates: I, k: Option<usize>) -> Vec<ScoredId>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut top = TopK::new(k);
        top.extend(
            candidates
                .into_iter()
                .filter(|&candidate| candidate != row)
                .map(|candidate| ScoredId(candidate, self.get(row, candidate))),
        );

        top.into_sorted_vec()
    }
}
