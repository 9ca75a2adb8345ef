//! Dense 2-D matrix.
//!
//! `Matrix` is the single numeric container shared by layers, optimizers and
//! snapshots. Storage is a contiguous row-major `Vec<f32>` with shape
//! `(rows, cols)`.
//!
//! Conventions used across the crate:
//! - a batch of samples is laid out column-wise: shape `(features, samples)`
//! - layer weights have shape `(width, fan_in)`
//!
//! Every binary operation validates operand shapes and returns
//! [`Error::InvalidShape`] on mismatch. Operations never mutate their operands.

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::matmul::gemm;
use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// A `(rows, cols)` matrix filled with `value`.
    pub fn fill(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    #[inline]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::fill(rows, cols, 0.0)
    }

    #[inline]
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::fill(rows, cols, 1.0)
    }

    /// Build from a flat row-major buffer.
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidShape(format!(
                "buffer length {} does not match rows * cols ({rows} * {cols})",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from literal rows. An empty slice yields a `0 x 0` matrix.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::InvalidShape(format!(
                    "row {i} has len {}, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Entries drawn independently from `U(-range, range)`.
    pub fn uniform<R: Rng + ?Sized>(rows: usize, cols: usize, range: f32, rng: &mut R) -> Self {
        let data = (0..rows * cols)
            .map(|_| {
                if range > 0.0 {
                    rng.gen_range(-range..=range)
                } else {
                    0.0
                }
            })
            .collect();
        Self { rows, cols, data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Entry at `(row, col)`.
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        self.data[row * self.cols + col]
    }

    /// Entry at `(row, col)`, or `None` if the index is out of bounds.
    #[inline]
    pub fn try_get(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// The `i`-th row as a slice.
    ///
    /// Panics if `i >= rows`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// The `j`-th column, copied.
    ///
    /// Panics if `j >= cols`.
    pub fn column(&self, j: usize) -> Vec<f32> {
        (0..self.rows).map(|i| self.data[i * self.cols + j]).collect()
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(<[f32]>::to_vec).collect()
    }

    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::InvalidShape(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        gemm(
            self.rows,
            self.cols,
            other.cols,
            &self.data,
            &other.data,
            &mut out.data,
        );
        Ok(out)
    }

    pub fn transpose(&self) -> Matrix {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.data[i * self.cols + j]);
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Element-wise product.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map(other, |a, b| a * b)
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_map(other, |a, b| a - b)
    }

    pub fn scalar_multiply(&self, scalar: f32) -> Matrix {
        self.map(|x| x * scalar)
    }

    pub fn scalar_add(&self, scalar: f32) -> Matrix {
        self.map(|x| x + scalar)
    }

    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Shape-checked element-wise combination.
    pub fn zip_map<F: Fn(f32, f32) -> f32>(&self, other: &Matrix, f: F) -> Result<Matrix> {
        self.require_same_shape(other)?;
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// A copy with row `index` removed.
    pub fn row_exclude(&self, index: usize) -> Result<Matrix> {
        if index >= self.rows {
            return Err(Error::InvalidShape(format!(
                "row {index} out of range for {} rows",
                self.rows
            )));
        }
        let mut data = Vec::with_capacity(self.data.len() - self.cols);
        data.extend_from_slice(&self.data[..index * self.cols]);
        data.extend_from_slice(&self.data[(index + 1) * self.cols..]);
        Ok(Matrix {
            rows: self.rows - 1,
            cols: self.cols,
            data,
        })
    }

    /// Stack `other`'s rows below this matrix.
    pub fn augment_below(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.cols {
            return Err(Error::InvalidShape(format!(
                "cannot augment {}x{} with {}x{}: column counts differ",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut data = Vec::with_capacity(self.data.len() + other.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&other.data);
        Ok(Matrix {
            rows: self.rows + other.rows,
            cols: self.cols,
            data,
        })
    }

    /// Largest absolute entry (0 for an empty matrix).
    pub fn max_norm(&self) -> f32 {
        self.data.iter().fold(0.0_f32, |acc, x| acc.max(x.abs()))
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Sum of each row, as a column vector of length `rows`.
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.rows).map(|i| self.row(i).iter().sum()).collect()
    }

    /// Overwrite this matrix with `other` (same shape required).
    pub(crate) fn copy_from(&mut self, other: &Matrix) -> Result<()> {
        self.require_same_shape(other)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    fn require_same_shape(&self, other: &Matrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::InvalidShape(format!(
                "shape mismatch: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(())
    }
}
