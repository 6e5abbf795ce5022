//! Row-compressed feature matrix produced by a schema.
//!
//! Rows are stored in CSR form: only non-zero cells are kept, so a schema
//! mixing a few scalar units with large n-gram vocabularies stays compact.
//!
//! The linear families train directly on the CSR rows through
//! [`FeatureMatrix::dot`], [`FeatureMatrix::t_dot`] and
//! [`FeatureMatrix::transpose`]. Families that need dense input go through
//! [`FeatureMatrix::to_dense`].

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};

/// A rows x columns matrix of features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
    sparse: bool,
}

impl FeatureMatrix {
    /// Create an empty matrix with `n_cols` columns.
    pub fn new(n_cols: usize) -> Self {
        FeatureMatrix {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
            sparse: false,
        }
    }

    /// Build a matrix from a dense array.
    pub fn from_dense(array: &Array2<f64>) -> Self {
        let mut matrix = FeatureMatrix::new(array.ncols());
        for row in array.rows() {
            let cells: Vec<(usize, f64)> = row
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect();
            matrix.push_sorted_row(&cells);
        }
        matrix
    }

    /// Append a row given as (column, value) pairs.
    ///
    /// Columns must be strictly increasing and below `ncols()`. Zero values are
    /// dropped.
    pub fn push_row(&mut self, cells: &[(usize, f64)]) -> Result<()> {
        let mut previous = None;
        for (column, _) in cells {
            if *column >= self.n_cols {
                return Err(ClickbaitError::data(format!(
                    "column {column} out of range for {} columns",
                    self.n_cols
                )));
            }
            if previous.is_some_and(|p| p >= *column) {
                return Err(ClickbaitError::data(format!(
                    "row columns are not strictly increasing at column {column}"
                )));
            }
            previous = Some(*column);
        }
        self.push_sorted_row(cells);
        Ok(())
    }

    fn push_sorted_row(&mut self, cells: &[(usize, f64)]) {
        for (column, value) in cells {
            if *value != 0.0 {
                self.indices.push(*column);
                self.values.push(*value);
            }
        }
        self.indptr.push(self.indices.len());
    }

    /// Mark the matrix as holding output of at least one sparse unit.
    pub fn set_sparse(&mut self, sparse: bool) {
        self.sparse = sparse;
    }

    /// Whether any contributing unit produced sparse output.
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    pub fn nrows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn ncols(&self) -> usize {
        self.n_cols
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.n_cols)
    }

    /// Number of stored non-zero cells.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Every stored value, row by row.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Non-zero cells of row `i` as parallel column and value slices.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.values[start..end])
    }

    /// Value of a single cell.
    pub fn get(&self, row: usize, column: usize) -> f64 {
        let (columns, values) = self.row(row);
        match columns.binary_search(&column) {
            Ok(pos) => values[pos],
            Err(_) => 0.0,
        }
    }

    /// Dense copy of row `i`.
    pub fn dense_row(&self, i: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_cols];
        let (columns, values) = self.row(i);
        for (column, value) in columns.iter().zip(values) {
            dense[*column] = *value;
        }
        dense
    }

    /// Dense copy of the whole matrix.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.nrows(), self.n_cols));
        for i in 0..self.nrows() {
            let (columns, values) = self.row(i);
            for (column, value) in columns.iter().zip(values) {
                dense[[i, *column]] = *value;
            }
        }
        dense
    }

    /// Dot product of row `i` with a dense vector of length `ncols()`.
    pub fn row_dot(&self, i: usize, w: &Array1<f64>) -> f64 {
        let (columns, values) = self.row(i);
        columns.iter().zip(values).map(|(c, v)| v * w[*c]).sum()
    }

    /// Add `scale * row(i)` to a dense vector of length `ncols()`.
    pub fn add_row_to(&self, i: usize, scale: f64, target: &mut Array1<f64>) {
        let (columns, values) = self.row(i);
        for (column, value) in columns.iter().zip(values) {
            target[*column] += scale * value;
        }
    }

    /// Sparse dot product of two rows, possibly of different matrices.
    pub fn rows_dot(&self, i: usize, other: &FeatureMatrix, j: usize) -> f64 {
        let (a_cols, a_vals) = self.row(i);
        let (b_cols, b_vals) = other.row(j);
        let (mut p, mut q) = (0, 0);
        let mut sum = 0.0;
        while p < a_cols.len() && q < b_cols.len() {
            match a_cols[p].cmp(&b_cols[q]) {
                std::cmp::Ordering::Less => p += 1,
                std::cmp::Ordering::Greater => q += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_vals[p] * b_vals[q];
                    p += 1;
                    q += 1;
                }
            }
        }
        sum
    }

    /// Squared L2 norm of every row.
    pub fn row_norms_squared(&self) -> Array1<f64> {
        (0..self.nrows())
            .map(|i| self.row(i).1.iter().map(|v| v * v).sum())
            .collect()
    }

    /// `X w` for a dense vector `w` of length `ncols()`.
    pub fn dot(&self, w: &Array1<f64>) -> Array1<f64> {
        (0..self.nrows()).map(|i| self.row_dot(i, w)).collect()
    }

    /// `Xᵀ u` for a dense vector `u` of length `nrows()`.
    pub fn t_dot(&self, u: &Array1<f64>) -> Array1<f64> {
        let mut result = Array1::zeros(self.n_cols);
        for i in 0..self.nrows() {
            self.add_row_to(i, u[i], &mut result);
        }
        result
    }

    /// Sum of every column.
    pub fn column_sums(&self) -> Array1<f64> {
        let mut sums = Array1::zeros(self.n_cols);
        for (column, value) in self.indices.iter().zip(&self.values) {
            sums[*column] += value;
        }
        sums
    }

    /// Transposed copy. Row `j` of the result holds column `j` of `self`,
    /// which gives the column access coordinate descent needs.
    pub fn transpose(&self) -> FeatureMatrix {
        let mut counts = vec![0usize; self.n_cols + 1];
        for column in &self.indices {
            counts[column + 1] += 1;
        }
        for j in 0..self.n_cols {
            counts[j + 1] += counts[j];
        }

        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0usize; self.values.len()];
        let mut values = vec![0.0; self.values.len()];
        for i in 0..self.nrows() {
            let (columns, row_values) = self.row(i);
            for (column, value) in columns.iter().zip(row_values) {
                let slot = next[*column];
                indices[slot] = i;
                values[slot] = *value;
                next[*column] += 1;
            }
        }

        FeatureMatrix {
            n_cols: self.nrows(),
            indptr,
            indices,
            values,
            sparse: self.sparse,
        }
    }

    /// New matrix made of the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Result<FeatureMatrix> {
        let mut selected = FeatureMatrix::new(self.n_cols);
        selected.sparse = self.sparse;
        for &i in rows {
            if i >= self.nrows() {
                return Err(ClickbaitError::data(format!(
                    "row {i} out of range for {} rows",
                    self.nrows()
                )));
            }
            let (start, end) = (self.indptr[i], self.indptr[i + 1]);
            selected.indices.extend_from_slice(&self.indices[start..end]);
            selected.values.extend_from_slice(&self.values[start..end]);
            selected.indptr.push(selected.indices.len());
        }
        Ok(selected)
    }
}
