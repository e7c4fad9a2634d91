//! Dense row-major matrix and the elementary operations the trainers are built from.
//!
//! Every operation borrows its operands and returns a freshly allocated result;
//! there are no in-place variants. Training loops rebind the variable holding
//! the current weights to the new value.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `rows × cols` array of `f64` stored contiguously, row by row.
///
/// Deserialization goes through [`Matrix::from_vec`], so a payload whose
/// `data` length disagrees with its shape is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = Error;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Matrix::from_vec(raw.rows, raw.cols, raw.data)
    }
}

impl Matrix {
    /// All-zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Matrix where every element is `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build from a flat row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::mismatch("from_vec", (rows, cols), (data.len(), 1)));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from per-row vectors. Ragged input is rejected.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::mismatch("from_rows", (n, cols), (1, row.len())));
            }
            data.extend(row);
        }
        Ok(Self { rows: n, cols, data })
    }

    /// A single-row matrix (`1 × values.len()`).
    pub fn row_vector(values: &[f64]) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            data: values.to_vec(),
        }
    }

    /// A single-column matrix (`values.len() × 1`).
    pub fn column_vector(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Element at `(r, c)`. Panics when out of bounds.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds for {:?}", self.shape());
        self.data[r * self.cols + c]
    }

    /// Borrow row `r`. Panics when out of bounds.
    #[inline]
    pub fn row(&self, r: usize) -> &[f64] {
        let start = r * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Copy of column `c`.
    pub fn column(&self, c: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |r| self.row(r))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }

    /// Standard matrix product `self · other`.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::mismatch("multiply", self.shape(), other.shape()));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            let lhs = self.row(i);
            let dst = &mut out.data[i * other.cols..(i + 1) * other.cols];
            for (k, &a) in lhs.iter().enumerate() {
                for (d, &b) in dst.iter_mut().zip(other.row(k)) {
                    *d += a * b;
                }
            }
        }
        Ok(out)
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with("add", other, |a, b| a + b)
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with("subtract", other, |a, b| a - b)
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with("hadamard", other, |a, b| a * b)
    }

    /// Scalar multiply.
    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|v| v * factor)
    }

    pub fn add_scalar(&self, value: f64) -> Matrix {
        self.map(|v| v + value)
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// Apply `f` to every element.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Apply `f(column, value)` to every element.
    pub fn map_columns<F: Fn(usize, f64) -> f64>(&self, f: F) -> Matrix {
        let cols = self.cols;
        Matrix {
            rows: self.rows,
            cols,
            data: self
                .data
                .iter()
                .enumerate()
                .map(|(i, &v)| f(i % cols, v))
                .collect(),
        }
    }

    /// Copy with a leading bias column of `1.0`.
    pub fn prepend_ones(&self) -> Matrix {
        let cols = self.cols + 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        for row in self.iter_rows() {
            data.push(1.0);
            data.extend_from_slice(row);
        }
        Matrix {
            rows: self.rows,
            cols,
            data,
        }
    }

    /// Copy without row 0, i.e. a weight matrix with its bias row removed.
    pub fn without_first_row(&self) -> Matrix {
        if self.rows == 0 {
            return self.clone();
        }
        Matrix {
            rows: self.rows - 1,
            cols: self.cols,
            data: self.data[self.cols..].to_vec(),
        }
    }

    /// Rows gathered in `indices` order; repeated indices are allowed.
    /// Panics when an index is out of bounds.
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Matrix {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }

    /// The listed columns, in order, as a new matrix.
    pub fn select_columns(&self, columns: &[usize]) -> Result<Matrix> {
        if let Some(&bad) = columns.iter().find(|&&c| c >= self.cols) {
            return Err(Error::mismatch("select_columns", self.shape(), (0, bad)));
        }
        let mut data = Vec::with_capacity(self.rows * columns.len());
        for row in self.iter_rows() {
            data.extend(columns.iter().map(|&c| row[c]));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: columns.len(),
            data,
        })
    }

    /// True when square and `|a_ij - a_ji| <= tol` everywhere.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        (0..self.rows).all(|i| (0..i).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tol))
    }

    fn zip_with<F: Fn(f64, f64) -> f64>(&self, op: &'static str, other: &Matrix, f: F) -> Result<Matrix> {
        if self.shape() != other.shape() {
            return Err(Error::mismatch(op, self.shape(), other.shape()));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix {}x{} [", self.rows, self.cols)?;
        for (i, row) in self.iter_rows().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{row:?}")?;
        }
        write!(f, "]")
    }
}
