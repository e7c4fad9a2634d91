//! Datasets, CSV ingestion, partitioning, and the toy data used by the demos.
use crate::error::{Error, IngestError, Result};
use crate::matrix::Matrix;
use csv::ReaderBuilder;
use rand::seq::index;
use rand::Rng;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Feature rows `x` paired with target rows `t`.
///
/// `x` carries no bias column; the standardizer adds it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Matrix,
    t: Matrix,
}

impl Dataset {
    pub fn new(x: Matrix, t: Matrix) -> Result<Self> {
        if x.rows() != t.rows() {
            return Err(Error::mismatch("dataset", x.shape(), t.shape()));
        }
        Ok(Self { x, t })
    }

    /// Split a loaded table: `target_columns` become `t`, every other column `x`.
    pub fn from_columns(table: &Matrix, target_columns: &[usize]) -> Result<Self> {
        let features: Vec<usize> = (0..table.cols())
            .filter(|c| !target_columns.contains(c))
            .collect();
        let x = table.select_columns(&features)?;
        let t = table.select_columns(target_columns)?;
        Self::new(x, t)
    }

    pub fn x(&self) -> &Matrix {
        &self.x
    }

    pub fn t(&self) -> &Matrix {
        &self.t
    }

    pub fn len(&self) -> usize {
        self.x.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.rows() == 0
    }

    pub fn input_dim(&self) -> usize {
        self.x.cols()
    }

    pub fn target_dim(&self) -> usize {
        self.t.cols()
    }

    /// Rows in `indices` order; repeats allowed.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select_rows(indices),
            t: self.t.select_rows(indices),
        }
    }

    /// Random train/test partition without replacement.
    ///
    /// `round(len * train_fraction)` distinct rows go to the training set.
    /// Both partitions keep the original row order.
    pub fn split<R: Rng + ?Sized>(&self, train_fraction: f64, rng: &mut R) -> Result<(Dataset, Dataset)> {
        if self.is_empty() {
            return Err(Error::EmptyDataset("cannot split zero rows"));
        }
        if !(train_fraction > 0.0 && train_fraction <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "train fraction must be in (0, 1], got {train_fraction}"
            )));
        }
        let n = self.len();
        let train_count = ((n as f64) * train_fraction).round().clamp(1.0, n as f64) as usize;
        let mut picked = vec![false; n];
        for i in index::sample(rng, n, train_count) {
            picked[i] = true;
        }
        let (train, test): (Vec<usize>, Vec<usize>) = (0..n).partition(|&i| picked[i]);
        Ok((self.select(&train), self.select(&test)))
    }
}

/// Anything that can produce a numeric table.
pub trait DataSource {
    fn load(&self) -> Result<Matrix>;
}

/// Comma-separated file, reading the inclusive column range
/// `first_column..=last_column` of every record.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub first_column: usize,
    pub last_column: usize,
    pub has_headers: bool,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>, first_column: usize, last_column: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            first_column,
            last_column,
            has_headers: false,
        }
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<Matrix> {
        if self.first_column > self.last_column {
            return Err(IngestError::ColumnRange {
                first: self.first_column,
                last: self.last_column,
            }
            .into());
        }
        let file = File::open(&self.path).map_err(|source| IngestError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(self.has_headers)
            .flexible(true)
            .from_reader(file);

        let width = self.last_column - self.first_column + 1;
        let mut data = Vec::new();
        let mut rows = 0;
        for result in rdr.records() {
            let record = result.map_err(|source| IngestError::Csv {
                path: self.path.clone(),
                source,
            })?;
            let line = record.position().map_or(0, |p| p.line());
            if record.len() <= self.last_column {
                return Err(IngestError::ShortRow {
                    path: self.path.clone(),
                    line,
                    column: self.last_column,
                    found: record.len(),
                    needed: self.last_column + 1,
                }
                .into());
            }
            for column in self.first_column..=self.last_column {
                let field = record[column].trim();
                let value: f64 = field.parse().map_err(|_| IngestError::Parse {
                    path: self.path.clone(),
                    line,
                    column,
                    value: field.to_owned(),
                })?;
                data.push(value);
            }
            rows += 1;
        }
        log::debug!("loaded {rows} rows x {width} columns from {}", self.path.display());
        Matrix::from_vec(rows, width, data)
    }
}

/// Powers `x^1..=x^degree` of every column, grouped per column.
pub fn polynomial_features(x: &Matrix, degree: u32) -> Result<Matrix> {
    let cols = x.cols() * degree as usize;
    let mut data = Vec::with_capacity(x.rows() * cols);
    for row in x.iter_rows() {
        for &v in row {
            data.extend((1..=degree).map(|p| v.powi(p as i32)));
        }
    }
    Matrix::from_vec(x.rows(), cols, data)
}

/// `t = 2 - 0.1 x + 0.05 (x - 7)^2 + noise`, `x` uniform in `[0, 10)`,
/// noise uniform in `[0, 0.1)`.
pub fn quadratic_trend<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Dataset {
    let mut xs = Vec::with_capacity(n);
    let mut ts = Vec::with_capacity(n);
    for _ in 0..n {
        let x: f64 = rng.gen_range(0.0..10.0);
        let noise: f64 = rng.gen_range(0.0..0.1);
        xs.push(x);
        ts.push(2.0 - 0.1 * x + 0.05 * (x - 7.0).powi(2) + noise);
    }
    Dataset {
        x: Matrix::column_vector(&xs),
        t: Matrix::column_vector(&ts),
    }
}

/// Two clusters, `x` in `[0, 3)` and `[6, 10)`, with
/// `t = -1 + 0.1 x^2 - 0.02 x^3 + noise`, noise uniform in `[-1, 1)`.
pub fn cubic_clusters<R: Rng + ?Sized>(per_cluster: usize, rng: &mut R) -> Dataset {
    let mut xs = Vec::with_capacity(2 * per_cluster);
    let mut ts = Vec::with_capacity(2 * per_cluster);
    for (low, high) in [(0.0, 3.0), (6.0, 10.0)] {
        for _ in 0..per_cluster {
            let x: f64 = rng.gen_range(low..high);
            let noise: f64 = rng.gen_range(-1.0..1.0);
            xs.push(x);
            ts.push(-1.0 + 0.1 * x.powi(2) - 0.02 * x.powi(3) + noise);
        }
    }
    Dataset {
        x: Matrix::column_vector(&xs),
        t: Matrix::column_vector(&ts),
    }
}

/// `n` evenly spaced points on `[-10, 10]` with
/// `t = 0.2 + 0.05 (x + 10) + 0.4 sin(x + 10) + noise`, noise uniform in `[0, 0.2)`.
///
/// `jitter` shifts each `x` by a uniform amount in `[0, jitter)`, which the
/// demo uses to build a test set near the training points.
pub fn noisy_sine<R: Rng + ?Sized>(n: usize, jitter: f64, rng: &mut R) -> Dataset {
    let step = if n > 1 { 20.0 / (n - 1) as f64 } else { 0.0 };
    let mut xs = Vec::with_capacity(n);
    let mut ts = Vec::with_capacity(n);
    for i in 0..n {
        let mut x = step * i as f64 - 10.0;
        if jitter > 0.0 {
            x += rng.gen_range(0.0..jitter);
        }
        let noise: f64 = rng.gen_range(0.0..0.2);
        xs.push(x);
        ts.push(0.2 + 0.05 * (x + 10.0) + 0.4 * (x + 10.0).sin() + noise);
    }
    Dataset {
        x: Matrix::column_vector(&xs),
        t: Matrix::column_vector(&ts),
    }
}
