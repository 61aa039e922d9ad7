// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{error::ErrorKind, Result};
use num_traits::float::Float;
use rand::RngCore;
use rand_distr::{Distribution, Normal};

/// Dense row-major matrix whose rows are indexed by entity ID.
///
/// Rows are only ever appended, so a row keeps its values for the whole run
/// once it exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    num_rows: usize,
    num_cols: usize,
    data: Vec<T>,
}

impl<T: Float> Matrix<T> {
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            data: vec![T::zero(); num_rows * num_cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let num_cols = rows.first().map(Vec::len).unwrap_or(0);
        let num_rows = rows.len();

        let mut matrix = Self::new(num_rows, num_cols);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().take(num_cols).enumerate() {
                matrix.set(r, c, value);
            }
        }

        matrix
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.num_cols + col]
    }

    /// Like `get`, but zero for cells outside the allocated area
    pub fn get_or_zero(&self, row: usize, col: usize) -> T {
        if row < self.num_rows && col < self.num_cols {
            self.get(row, col)
        } else {
            T::zero()
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.num_cols + col] = value;
    }

    pub fn inc(&mut self, row: usize, col: usize, value: T) {
        let cell = &mut self.data[row * self.num_cols + col];
        *cell = *cell + value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        let start = row * self.num_cols;
        &self.data[start..start + self.num_cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = row * self.num_cols;
        &mut self.data[start..start + self.num_cols]
    }

    pub fn set_row(&mut self, row: usize, values: &[T]) {
        self.row_mut(row).copy_from_slice(values);
    }

    pub fn has_row(&self, row: usize) -> bool {
        row < self.num_rows
    }

    /// Appends rows until there are at least `num_rows`, filling every new
    /// cell with `init`
    pub fn grow_rows<F>(&mut self, num_rows: usize, mut init: F)
    where
        F: FnMut() -> T,
    {
        if num_rows <= self.num_rows {
            return;
        }

        let new_cells = (num_rows - self.num_rows) * self.num_cols;
        self.data.extend((0..new_cells).map(|_| init()));
        self.num_rows = num_rows;
    }

    /// Dot product between row `a` of `self` and row `b` of `other`, zero if
    /// either row is not allocated
    pub fn row_dot(&self, a: usize, other: &Matrix<T>, b: usize) -> T {
        if !self.has_row(a) || !other.has_row(b) {
            return T::zero();
        }

        self.row(a)
            .iter()
            .zip(other.row(b))
            .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }
}

impl Matrix<f64> {
    /// Fresh matrix with every cell drawn from N(mean, stdev)
    pub fn normal(
        num_rows: usize,
        num_cols: usize,
        mean: f64,
        stdev: f64,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        let mut matrix = Self::new(0, num_cols);
        matrix.grow_rows_normal(num_rows, mean, stdev, rng)?;
        Ok(matrix)
    }

    pub fn grow_rows_normal(
        &mut self,
        num_rows: usize,
        mean: f64,
        stdev: f64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let normal =
            Normal::new(mean, stdev).map_err(|_| ErrorKind::InvalidDistribution(mean, stdev))?;

        self.grow_rows(num_rows, || normal.sample(&mut *rng));
        Ok(())
    }
}

/// Grows a bias vector to `len` entries, new entries are zero
pub fn grow_vec(values: &mut Vec<f64>, len: usize) {
    if values.len() < len {
        values.resize(len, 0.0);
    }
}
