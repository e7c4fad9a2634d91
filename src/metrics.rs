//! Metrics for evaluating regression outputs.
use crate::error::{Error, Result};
use crate::matrix::Matrix;

/// Root-mean-squared error per output column.
pub fn rmse(predicted: &Matrix, actual: &Matrix) -> Result<Vec<f64>> {
    if predicted.shape() != actual.shape() {
        return Err(Error::mismatch("rmse", predicted.shape(), actual.shape()));
    }
    if predicted.is_empty() {
        return Err(Error::EmptyDataset("rmse needs at least one row"));
    }
    let mut acc = RmseAccumulator::new(predicted.cols());
    for (p, a) in predicted.iter_rows().zip(actual.iter_rows()) {
        acc.push_pair(p, a);
    }
    Ok(acc.finish(predicted.rows()))
}

/// Running sum of squared errors, one slot per output column.
///
/// Used by the trainers to report an epoch's RMSE from the errors they
/// already computed for their updates.
#[derive(Debug, Clone)]
pub struct RmseAccumulator {
    sums: Vec<f64>,
}

impl RmseAccumulator {
    pub fn new(columns: usize) -> Self {
        Self {
            sums: vec![0.0; columns],
        }
    }

    /// Add one row of already-computed errors.
    pub fn push_errors(&mut self, errors: &[f64]) {
        for (s, &e) in self.sums.iter_mut().zip(errors) {
            *s += e * e;
        }
    }

    /// Add every row of an error matrix.
    pub fn push_matrix(&mut self, errors: &Matrix) {
        for row in errors.iter_rows() {
            self.push_errors(row);
        }
    }

    fn push_pair(&mut self, predicted: &[f64], actual: &[f64]) {
        for ((s, &p), &a) in self.sums.iter_mut().zip(predicted).zip(actual) {
            *s += (p - a) * (p - a);
        }
    }

    /// `sqrt(sum / sample_count)` per column.
    pub fn finish(&self, sample_count: usize) -> Vec<f64> {
        let n = sample_count as f64;
        self.sums.iter().map(|&s| (s / n).sqrt()).collect()
    }

    pub fn reset(&mut self) {
        self.sums.iter_mut().for_each(|s| *s = 0.0);
    }
}
