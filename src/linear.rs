//! Linear model trained by online (per-sample) gradient descent.
//!
//! With the identity output this is the delta rule: for every row in dataset
//! order, `w += rate * x_j^T · (t_j - x_j · w)`, applied immediately so the
//! next row already sees the updated weights. A sigmoid or tanh output unit
//! scales the error by the derivative taken from the unit's output.
use crate::activations::ActivationKind;
use crate::config::TrainingConfig;
use crate::datasets::Dataset;
use crate::ensemble::{Regressor, Trainer};
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::metrics::RmseAccumulator;
use crate::report::{EpochReport, Reporter, TrainingSummary};
use crate::standardize::{self, StandardizationStats};

/// Configuration of the online linear trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTrainer {
    pub learning_rate: f64,
    pub epoch_count: usize,
    pub activation: ActivationKind,
    pub standardize_targets: bool,
}

impl LinearTrainer {
    pub fn new(learning_rate: f64, epoch_count: usize) -> Self {
        Self {
            learning_rate,
            epoch_count,
            activation: ActivationKind::Identity,
            standardize_targets: false,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            epoch_count: config.epoch_count,
            activation: config.activation,
            standardize_targets: config.standardize_targets,
        }
    }

    pub fn with_activation(mut self, activation: ActivationKind) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_standardized_targets(mut self, yes: bool) -> Self {
        self.standardize_targets = yes;
        self
    }

    /// Run the epoch loop on prepared inputs.
    ///
    /// `x` must already contain its bias column; nothing is standardized here.
    /// Weights start at zero with shape `x.cols() × t.cols()`.
    pub fn fit_weights(&self, x: &Matrix, t: &Matrix, reporter: &mut dyn Reporter) -> Result<Matrix> {
        self.check(x, t)?;
        let f = self.activation.activation();
        let mut w = Matrix::zeros(x.cols(), t.cols());
        let mut acc = RmseAccumulator::new(t.cols());

        for epoch in 0..self.epoch_count {
            acc.reset();
            for j in 0..x.rows() {
                let xj = Matrix::row_vector(x.row(j));
                let tj = Matrix::row_vector(t.row(j));
                let y = f.apply_matrix(&xj.multiply(&w)?);
                let error = tj.subtract(&y)?;
                let delta = error.hadamard(&f.derivative_matrix(&y))?;
                let gradient = xj.transpose().multiply(&delta)?;
                w = w.add(&gradient.scale(self.learning_rate))?;
                acc.push_errors(error.as_slice());
            }
            let rmse = acc.finish(x.rows());
            log::trace!("linear epoch {epoch}: rmse {rmse:?}");
            reporter.on_epoch(&EpochReport {
                member: None,
                epoch,
                rmse,
            });
        }
        Ok(w)
    }

    /// Standardize, fit, and package a [`LinearModel`].
    pub fn train(&self, data: &Dataset, reporter: &mut dyn Reporter) -> Result<LinearModel> {
        if data.is_empty() {
            return Err(Error::EmptyDataset("linear training set has no rows"));
        }
        log::debug!(
            "training linear model: {} rows, {} inputs, {} outputs, {} epochs",
            data.len(),
            data.input_dim(),
            data.target_dim(),
            self.epoch_count
        );
        let x_stats = standardize::fit(data.x())?;
        let x = standardize::transform(data.x(), &x_stats, true)?;
        let t_stats = if self.standardize_targets {
            Some(standardize::fit(data.t())?)
        } else {
            None
        };
        let t = match &t_stats {
            Some(stats) => standardize::transform(data.t(), stats, false)?,
            None => data.t().clone(),
        };

        let weights = self.fit_weights(&x, &t, reporter)?;
        let model = LinearModel {
            weights,
            x_stats,
            t_stats,
            activation: self.activation,
        };
        reporter.on_finish(&TrainingSummary {
            member: None,
            weights: vec![model.weights.clone()],
            predictions: model.predict(data.x())?,
        });
        Ok(model)
    }

    fn check(&self, x: &Matrix, t: &Matrix) -> Result<()> {
        if x.is_empty() {
            return Err(Error::EmptyDataset("linear training set has no rows"));
        }
        if x.rows() != t.rows() {
            return Err(Error::mismatch("linear fit", x.shape(), t.shape()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if self.epoch_count == 0 {
            return Err(Error::InvalidConfig("epoch count must be > 0".to_owned()));
        }
        Ok(())
    }
}

impl Trainer for LinearTrainer {
    type Model = LinearModel;

    /// Zero-initialized, so the seed is unused.
    fn train_seeded(&self, data: &Dataset, _seed: u64, reporter: &mut dyn Reporter) -> Result<LinearModel> {
        self.train(data, reporter)
    }
}

/// A trained linear model. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    weights: Matrix,
    x_stats: StandardizationStats,
    t_stats: Option<StandardizationStats>,
    activation: ActivationKind,
}

impl LinearModel {
    /// `(inputs + 1) × outputs`, bias row first.
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn x_stats(&self) -> &StandardizationStats {
        &self.x_stats
    }

    pub fn t_stats(&self) -> Option<&StandardizationStats> {
        self.t_stats.as_ref()
    }

    pub fn activation(&self) -> ActivationKind {
        self.activation
    }

    /// Predict in target units from raw (unstandardized, bias-free) inputs.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        let xs = standardize::transform(x, &self.x_stats, true)?;
        let y = self.activation.activation().apply_matrix(&xs.multiply(&self.weights)?);
        match &self.t_stats {
            Some(stats) => standardize::inverse_transform(&y, stats),
            None => Ok(y),
        }
    }
}

impl Regressor for LinearModel {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        LinearModel::predict(self, x)
    }

    fn output_dim(&self) -> usize {
        self.weights.cols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::rmse;
    use crate::report::{NullReporter, RecordingReporter};
    use approx::assert_abs_diff_eq;

    fn exact_line() -> (Matrix, Matrix) {
        let x = Matrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![1.0, 2.0],
            vec![1.0, 3.0],
        ])
        .unwrap();
        let t = Matrix::column_vector(&[2.0, 4.0, 6.0, 8.0]);
        (x, t)
    }

    #[test]
    fn converges_to_exact_linear_weights() {
        let (x, t) = exact_line();
        let w = LinearTrainer::new(0.05, 200)
            .fit_weights(&x, &t, &mut NullReporter)
            .unwrap();
        assert_eq!(w.shape(), (2, 1));
        assert_abs_diff_eq!(w.get(0, 0), 2.0, epsilon = 0.05);
        assert_abs_diff_eq!(w.get(1, 0), 2.0, epsilon = 0.05);
    }

    #[test]
    fn first_update_uses_zero_weights() {
        // one row, one epoch: w = rate * x^T t
        let x = Matrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let t = Matrix::row_vector(&[3.0]);
        let w = LinearTrainer::new(0.1, 1)
            .fit_weights(&x, &t, &mut NullReporter)
            .unwrap();
        assert_abs_diff_eq!(w.get(0, 0), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(w.get(1, 0), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn updates_are_online() {
        // second row must see the weights updated by the first
        let x = Matrix::from_rows(vec![vec![1.0], vec![1.0]]).unwrap();
        let t = Matrix::column_vector(&[1.0, 1.0]);
        let w = LinearTrainer::new(0.5, 1)
            .fit_weights(&x, &t, &mut NullReporter)
            .unwrap();
        // 0 -> 0.5 -> 0.75
        assert_abs_diff_eq!(w.get(0, 0), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn reports_every_epoch_and_rmse_falls() {
        let (x, t) = exact_line();
        let mut rec = RecordingReporter::new();
        LinearTrainer::new(0.05, 50).fit_weights(&x, &t, &mut rec).unwrap();
        assert_eq!(rec.epochs.len(), 50);
        let history = rec.rmse_history(None);
        assert!(history.last().unwrap()[0] < history[0][0]);
    }

    #[test]
    fn train_standardizes_and_predicts_in_target_units() {
        let x = Matrix::column_vector(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let t = x.map(|v| 3.0 * v - 1.0);
        let data = Dataset::new(x.clone(), t.clone()).unwrap();
        let mut rec = RecordingReporter::new();
        let model = LinearTrainer::new(0.1, 300)
            .with_standardized_targets(true)
            .train(&data, &mut rec)
            .unwrap();
        let pred = model.predict(&x).unwrap();
        assert!(rmse(&pred, &t).unwrap()[0] < 1e-3);
        assert_eq!(rec.summaries.len(), 1);
        assert_eq!(rec.summaries[0].predictions, pred);
        assert!(model.t_stats().is_some());
    }

    #[test]
    fn sigmoid_unit_learns_a_separable_target() {
        let x = Matrix::column_vector(&[-2.0, -1.0, 1.0, 2.0]);
        let t = Matrix::column_vector(&[0.0, 0.0, 1.0, 1.0]);
        let data = Dataset::new(x.clone(), t.clone()).unwrap();
        let model = LinearTrainer::new(0.5, 500)
            .with_activation(ActivationKind::Sigmoid)
            .train(&data, &mut NullReporter)
            .unwrap();
        let pred = model.predict(&x).unwrap();
        assert!(pred.get(0, 0) < 0.2 && pred.get(3, 0) > 0.8);
        assert!(pred.as_slice().iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn rejects_bad_inputs() {
        let trainer = LinearTrainer::new(0.1, 10);
        let empty = Matrix::zeros(0, 2);
        assert!(matches!(
            trainer.fit_weights(&empty, &Matrix::zeros(0, 1), &mut NullReporter),
            Err(Error::EmptyDataset(_))
        ));
        assert!(matches!(
            trainer.fit_weights(&Matrix::zeros(3, 2), &Matrix::zeros(2, 1), &mut NullReporter),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            LinearTrainer::new(0.0, 10).fit_weights(&Matrix::zeros(1, 1), &Matrix::zeros(1, 1), &mut NullReporter),
            Err(Error::InvalidConfig(_))
        ));
        let constant = Dataset::new(Matrix::filled(3, 1, 2.0), Matrix::zeros(3, 1)).unwrap();
        assert!(matches!(
            trainer.train(&constant, &mut NullReporter),
            Err(Error::DegenerateColumn { column: 0 })
        ));
        // constant 0.1 leaves a rounding-sized std behind
        let nearly = Dataset::new(Matrix::filled(3, 1, 0.1), Matrix::column_vector(&[1.0, 2.0, 3.0])).unwrap();
        assert!(matches!(
            trainer.train(&nearly, &mut NullReporter),
            Err(Error::DegenerateColumn { column: 0 })
        ));
    }
}
