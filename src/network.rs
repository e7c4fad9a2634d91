//! Two-layer regression network: tanh hidden layer, linear output layer.
//!
//! Shapes, with `X` already standardized and carrying its bias column:
//!
//! - `Z  = tanh(X · V)`            `V: (inputs + 1) × hidden`
//! - `Z1 = [1 | Z]`
//! - `Y  = Z1 · W`                 `W: (hidden + 1) × outputs`
//!
//! One backpropagation step with `err = T - Y` is
//!
//! - `V += rh * X^T · ((err · W_noBias^T) ⊙ (1 - Z²))`
//! - `W += ro * Z1^T · err`
//!
//! where both updates are computed from the pre-update `W`. The full-batch
//! regime takes that step once per epoch over every row; the per-sample regime
//! takes it once per row with a single rate.
use crate::activations::{deriv_tanh_from_output, tanh};
use crate::config::{TrainingConfig, UpdateRegime};
use crate::datasets::Dataset;
use crate::ensemble::{Regressor, Trainer};
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::metrics::RmseAccumulator;
use crate::report::{EpochReport, Reporter, TrainingSummary};
use crate::standardize::{self, StandardizationStats};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Weights of the two layers, bias rows first.
#[derive(Debug, Clone, PartialEq)]
pub struct ShallowNetwork {
    pub hidden_weights: Matrix,
    pub output_weights: Matrix,
}

/// Cached activations of one forward pass.
#[derive(Debug, Clone)]
pub struct Forward {
    /// Hidden activations `Z` (already passed through tanh).
    pub hidden: Matrix,
    /// `Z` with its bias column.
    pub hidden_with_bias: Matrix,
    pub output: Matrix,
}

impl ShallowNetwork {
    pub fn new(hidden_weights: Matrix, output_weights: Matrix) -> Result<Self> {
        if hidden_weights.cols() + 1 != output_weights.rows() {
            return Err(Error::mismatch(
                "shallow network layers",
                hidden_weights.shape(),
                output_weights.shape(),
            ));
        }
        Ok(Self {
            hidden_weights,
            output_weights,
        })
    }

    /// Uniform weights in `[-scale, scale)` from a seeded generator, hidden
    /// layer drawn first.
    ///
    /// `inputs` excludes the bias column.
    pub fn seeded(inputs: usize, hidden: usize, outputs: usize, scale: f64, seed: u64) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::InvalidConfig(format!("weight scale must be finite and > 0, got {scale}")));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let hidden_weights = uniform(&mut rng, inputs + 1, hidden, scale)?;
        let output_weights = uniform(&mut rng, hidden + 1, outputs, scale)?;
        Self::new(hidden_weights, output_weights)
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden_weights.cols()
    }

    pub fn output_dim(&self) -> usize {
        self.output_weights.cols()
    }

    /// Forward pass over bias-prefixed standardized inputs.
    pub fn forward(&self, x: &Matrix) -> Result<Forward> {
        let hidden = tanh(&x.multiply(&self.hidden_weights)?);
        let hidden_with_bias = hidden.prepend_ones();
        let output = hidden_with_bias.multiply(&self.output_weights)?;
        Ok(Forward {
            hidden,
            hidden_with_bias,
            output,
        })
    }

    /// One simultaneous update of both layers; returns the new weights and
    /// the pre-update error `T - Y`.
    pub fn backprop_step(&self, x: &Matrix, t: &Matrix, hidden_rate: f64, output_rate: f64) -> Result<(Self, Matrix)> {
        let fwd = self.forward(x)?;
        let err = t.subtract(&fwd.output)?;

        let hidden_delta = err
            .multiply(&self.output_weights.without_first_row().transpose())?
            .hadamard(&deriv_tanh_from_output(&fwd.hidden))?;
        let hidden_weights = x
            .transpose()
            .multiply(&hidden_delta)?
            .scale(hidden_rate)
            .add(&self.hidden_weights)?;
        let output_weights = fwd
            .hidden_with_bias
            .transpose()
            .multiply(&err)?
            .scale(output_rate)
            .add(&self.output_weights)?;

        Ok((
            Self {
                hidden_weights,
                output_weights,
            },
            err,
        ))
    }
}

fn uniform(rng: &mut StdRng, rows: usize, cols: usize, scale: f64) -> Result<Matrix> {
    let data = (0..rows * cols).map(|_| rng.gen_range(-scale..scale)).collect();
    Matrix::from_vec(rows, cols, data)
}

impl fmt::Display for ShallowNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShallowNetwork: [{}, {}, {}]",
            self.hidden_weights.rows().saturating_sub(1),
            self.hidden_units(),
            self.output_dim()
        )
    }
}

/// Update schedule with its learning rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateRule {
    FullBatch { hidden_rate: f64, output_rate: f64 },
    PerSample { rate: f64 },
}

/// Configuration of the shallow network trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShallowTrainer {
    pub hidden_units: usize,
    pub epoch_count: usize,
    pub rule: UpdateRule,
    pub weight_scale: f64,
    pub standardize_targets: bool,
}

impl ShallowTrainer {
    pub fn full_batch(hidden_units: usize, hidden_rate: f64, output_rate: f64, epoch_count: usize) -> Self {
        Self {
            hidden_units,
            epoch_count,
            rule: UpdateRule::FullBatch {
                hidden_rate,
                output_rate,
            },
            weight_scale: 0.1,
            standardize_targets: false,
        }
    }

    pub fn per_sample(hidden_units: usize, rate: f64, epoch_count: usize) -> Self {
        Self {
            hidden_units,
            epoch_count,
            rule: UpdateRule::PerSample { rate },
            weight_scale: 0.1,
            standardize_targets: false,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        let rule = match config.regime {
            UpdateRegime::FullBatch => UpdateRule::FullBatch {
                hidden_rate: config.hidden_rate(),
                output_rate: config.learning_rate,
            },
            UpdateRegime::PerSample => UpdateRule::PerSample {
                rate: config.learning_rate,
            },
        };
        Self {
            hidden_units: config.hidden_units,
            epoch_count: config.epoch_count,
            rule,
            weight_scale: config.weight_scale,
            standardize_targets: config.standardize_targets,
        }
    }

    pub fn with_weight_scale(mut self, scale: f64) -> Self {
        self.weight_scale = scale;
        self
    }

    pub fn with_standardized_targets(mut self, yes: bool) -> Self {
        self.standardize_targets = yes;
        self
    }

    /// Run the epoch loop from `initial` on prepared inputs (`x` standardized,
    /// with bias column).
    pub fn fit_network(
        &self,
        initial: ShallowNetwork,
        x: &Matrix,
        t: &Matrix,
        reporter: &mut dyn Reporter,
    ) -> Result<ShallowNetwork> {
        self.check(x, t)?;
        if initial.hidden_weights.rows() != x.cols() || initial.output_dim() != t.cols() {
            return Err(Error::mismatch(
                "shallow network fit",
                (x.cols(), t.cols()),
                (initial.hidden_weights.rows(), initial.output_dim()),
            ));
        }

        let mut net = initial;
        let mut acc = RmseAccumulator::new(t.cols());
        for epoch in 0..self.epoch_count {
            acc.reset();
            match self.rule {
                UpdateRule::FullBatch {
                    hidden_rate,
                    output_rate,
                } => {
                    let (next, err) = net.backprop_step(x, t, hidden_rate, output_rate)?;
                    acc.push_matrix(&err);
                    net = next;
                }
                UpdateRule::PerSample { rate } => {
                    for j in 0..x.rows() {
                        let xj = Matrix::row_vector(x.row(j));
                        let tj = Matrix::row_vector(t.row(j));
                        let (next, err) = net.backprop_step(&xj, &tj, rate, rate)?;
                        acc.push_matrix(&err);
                        net = next;
                    }
                }
            }
            let rmse = acc.finish(x.rows());
            log::trace!("network epoch {epoch}: rmse {rmse:?}");
            reporter.on_epoch(&EpochReport {
                member: None,
                epoch,
                rmse,
            });
        }
        Ok(net)
    }

    /// Standardize, initialize from `seed`, fit, and package a [`ShallowModel`].
    pub fn train(&self, data: &Dataset, seed: u64, reporter: &mut dyn Reporter) -> Result<ShallowModel> {
        if data.is_empty() {
            return Err(Error::EmptyDataset("network training set has no rows"));
        }
        log::debug!(
            "training shallow network {:?}: {} rows, {} inputs, {} hidden, {} outputs, {} epochs, seed {seed}",
            self.rule,
            data.len(),
            data.input_dim(),
            self.hidden_units,
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

        let initial = ShallowNetwork::seeded(
            data.input_dim(),
            self.hidden_units,
            data.target_dim(),
            self.weight_scale,
            seed,
        )?;
        let network = self.fit_network(initial, &x, &t, reporter)?;
        let model = ShallowModel {
            network,
            x_stats,
            t_stats,
        };
        reporter.on_finish(&TrainingSummary {
            member: None,
            weights: vec![
                model.network.hidden_weights.clone(),
                model.network.output_weights.clone(),
            ],
            predictions: model.predict(data.x())?,
        });
        Ok(model)
    }

    fn check(&self, x: &Matrix, t: &Matrix) -> Result<()> {
        if x.is_empty() {
            return Err(Error::EmptyDataset("network training set has no rows"));
        }
        if x.rows() != t.rows() {
            return Err(Error::mismatch("shallow network fit", x.shape(), t.shape()));
        }
        if self.hidden_units == 0 {
            return Err(Error::InvalidConfig("shallow network needs hidden units".to_owned()));
        }
        if self.epoch_count == 0 {
            return Err(Error::InvalidConfig("epoch count must be > 0".to_owned()));
        }
        let rates = match self.rule {
            UpdateRule::FullBatch {
                hidden_rate,
                output_rate,
            } => [hidden_rate, output_rate],
            UpdateRule::PerSample { rate } => [rate, rate],
        };
        if rates.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(Error::InvalidConfig(format!("learning rates must be finite and > 0, got {:?}", self.rule)));
        }
        Ok(())
    }
}

impl Trainer for ShallowTrainer {
    type Model = ShallowModel;

    fn train_seeded(&self, data: &Dataset, seed: u64, reporter: &mut dyn Reporter) -> Result<ShallowModel> {
        self.train(data, seed, reporter)
    }
}

/// A trained network with the stats needed to map raw inputs and outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ShallowModel {
    network: ShallowNetwork,
    x_stats: StandardizationStats,
    t_stats: Option<StandardizationStats>,
}

impl ShallowModel {
    pub fn network(&self) -> &ShallowNetwork {
        &self.network
    }

    pub fn x_stats(&self) -> &StandardizationStats {
        &self.x_stats
    }

    pub fn t_stats(&self) -> Option<&StandardizationStats> {
        self.t_stats.as_ref()
    }

    /// Predict in target units from raw inputs.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        let xs = standardize::transform(x, &self.x_stats, true)?;
        let y = self.network.forward(&xs)?.output;
        match &self.t_stats {
            Some(stats) => standardize::inverse_transform(&y, stats),
            None => Ok(y),
        }
    }
}

impl Regressor for ShallowModel {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        ShallowModel::predict(self, x)
    }

    fn output_dim(&self) -> usize {
        self.network.output_dim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::rmse;
    use crate::report::{NullReporter, RecordingReporter};
    use approx::assert_abs_diff_eq;

    fn xor() -> Dataset {
        let x = Matrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ])
        .unwrap();
        let t = Matrix::column_vector(&[0.0, 1.0, 1.0, 0.0]);
        Dataset::new(x, t).unwrap()
    }

    #[test]
    fn seeded_init_is_reproducible_and_bounded() {
        let a = ShallowNetwork::seeded(2, 5, 1, 0.1, 17).unwrap();
        let b = ShallowNetwork::seeded(2, 5, 1, 0.1, 17).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hidden_weights.shape(), (3, 5));
        assert_eq!(a.output_weights.shape(), (6, 1));
        assert!(a
            .hidden_weights
            .as_slice()
            .iter()
            .chain(a.output_weights.as_slice())
            .all(|w| (-0.1..0.1).contains(w)));
        assert_ne!(a, ShallowNetwork::seeded(2, 5, 1, 0.1, 18).unwrap());
    }

    #[test]
    fn backprop_step_matches_hand_computation() {
        // one input + bias, one hidden unit, one output
        let v = Matrix::from_rows(vec![vec![0.0], vec![0.5]]).unwrap();
        let w = Matrix::from_rows(vec![vec![0.1], vec![0.2]]).unwrap();
        let net = ShallowNetwork::new(v, w).unwrap();
        let x = Matrix::row_vector(&[1.0, 2.0]);
        let t = Matrix::row_vector(&[1.0]);

        let z = 1.0f64.tanh();
        let y = 0.1 + 0.2 * z;
        let err = 1.0 - y;
        let delta = err * 0.2 * (1.0 - z * z);

        let (next, e) = net.backprop_step(&x, &t, 0.5, 0.25).unwrap();
        assert_abs_diff_eq!(e.get(0, 0), err, epsilon = 1e-12);
        assert_abs_diff_eq!(next.hidden_weights.get(0, 0), 0.5 * delta, epsilon = 1e-12);
        assert_abs_diff_eq!(next.hidden_weights.get(1, 0), 0.5 + 0.5 * 2.0 * delta, epsilon = 1e-12);
        assert_abs_diff_eq!(next.output_weights.get(0, 0), 0.1 + 0.25 * err, epsilon = 1e-12);
        assert_abs_diff_eq!(next.output_weights.get(1, 0), 0.2 + 0.25 * z * err, epsilon = 1e-12);
    }

    #[test]
    fn full_batch_learns_xor() {
        let data = xor();
        let mut rec = RecordingReporter::new();
        let model = ShallowTrainer::full_batch(4, 0.1, 0.1, 2000)
            .with_weight_scale(0.5)
            .train(&data, 5, &mut rec)
            .unwrap();
        let history = rec.rmse_history(None);
        assert_eq!(history.len(), 2000);
        let final_rmse = rmse(&model.predict(data.x()).unwrap(), data.t()).unwrap()[0];
        assert!(final_rmse < 0.1, "rmse {final_rmse}");
        assert!(final_rmse < history[0][0]);
    }

    #[test]
    fn per_sample_learns_xor() {
        let data = xor();
        let mut rec = RecordingReporter::new();
        let model = ShallowTrainer::per_sample(8, 0.1, 1000)
            .with_weight_scale(0.5)
            .train(&data, 21, &mut rec)
            .unwrap();
        let final_rmse = rmse(&model.predict(data.x()).unwrap(), data.t()).unwrap()[0];
        assert!(final_rmse < 0.1, "rmse {final_rmse}");
        assert!(final_rmse < rec.rmse_history(None)[0][0]);
    }

    #[test]
    fn full_batch_uses_pre_update_output_weights() {
        // two-row batch: the hidden step must see the original W, not the updated one
        let net = ShallowNetwork::seeded(1, 3, 1, 0.3, 4).unwrap();
        let x = Matrix::from_rows(vec![vec![1.0, -1.0], vec![1.0, 1.0]]).unwrap();
        let t = Matrix::column_vector(&[0.5, -0.5]);
        let (next, err) = net.backprop_step(&x, &t, 0.2, 0.2).unwrap();

        let fwd = net.forward(&x).unwrap();
        let expected_v = x
            .transpose()
            .multiply(
                &err.multiply(&net.output_weights.without_first_row().transpose())
                    .unwrap()
                    .hadamard(&deriv_tanh_from_output(&fwd.hidden))
                    .unwrap(),
            )
            .unwrap()
            .scale(0.2)
            .add(&net.hidden_weights)
            .unwrap();
        assert_eq!(next.hidden_weights, expected_v);
    }

    #[test]
    fn standardized_targets_are_mapped_back() {
        let x = Matrix::column_vector(&(0..20).map(|i| i as f64 / 4.0).collect::<Vec<_>>());
        let t = x.map(|v| 100.0 + 10.0 * v);
        let data = Dataset::new(x.clone(), t.clone()).unwrap();
        let model = ShallowTrainer::full_batch(5, 0.01, 0.01, 2000)
            .with_standardized_targets(true)
            .train(&data, 1, &mut NullReporter)
            .unwrap();
        let pred = model.predict(&x).unwrap();
        // 10% of the target's spread
        assert!(rmse(&pred, &t).unwrap()[0] < 5.0);
        assert!(model.t_stats().is_some());
    }

    #[test]
    fn invalid_configurations_fail() {
        let data = xor();
        assert!(matches!(
            ShallowTrainer::full_batch(0, 0.1, 0.1, 10).train(&data, 0, &mut NullReporter),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ShallowTrainer::per_sample(2, f64::NAN, 10).train(&data, 0, &mut NullReporter),
            Err(Error::InvalidConfig(_))
        ));
        let net = ShallowNetwork::seeded(3, 2, 1, 0.1, 0).unwrap();
        let x = Matrix::filled(4, 3, 1.0);
        assert!(matches!(
            ShallowTrainer::full_batch(2, 0.1, 0.1, 1).fit_network(net, &x, data.t(), &mut NullReporter),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(ShallowNetwork::new(Matrix::zeros(3, 2), Matrix::zeros(2, 1)).is_err());
        assert!(matches!(
            ShallowTrainer::full_batch(2, 0.1, 0.1, 1)
                .with_weight_scale(0.0)
                .train(&data, 0, &mut NullReporter),
            Err(Error::InvalidConfig(_))
        ));
    }
}
