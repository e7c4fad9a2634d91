//! Bootstrap ensembles.
//!
//! Every member is trained from scratch on its own resample of the training
//! set (same size, drawn with replacement). The point prediction is the mean
//! of the members; the spread across members approximates model uncertainty.
use crate::datasets::Dataset;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::report::{MemberReporter, Reporter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A trained model that maps raw inputs to outputs in target units.
pub trait Regressor {
    fn predict(&self, x: &Matrix) -> Result<Matrix>;
    fn output_dim(&self) -> usize;
}

/// Something that turns a dataset into a fresh [`Regressor`].
pub trait Trainer {
    type Model: Regressor;

    /// Train one model. `seed` drives any random initialization.
    fn train_seeded(&self, data: &Dataset, seed: u64, reporter: &mut dyn Reporter) -> Result<Self::Model>;
}

/// Source of row indices for one resample of an `n`-row training set.
pub trait IndexSampler {
    fn sample(&mut self, n: usize) -> Vec<usize>;
}

/// `n` indices drawn uniformly from `[0, n)` with replacement.
#[derive(Debug, Clone)]
pub struct BootstrapSampler {
    rng: StdRng,
}

impl BootstrapSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl IndexSampler for BootstrapSampler {
    fn sample(&mut self, n: usize) -> Vec<usize> {
        (0..n).map(|_| self.rng.gen_range(0..n)).collect()
    }
}

/// Seed of the bootstrap stream for an ensemble built from `seed`.
///
/// Kept apart from the member initializer seeds `seed + i`.
pub fn sampler_seed(seed: u64) -> u64 {
    seed ^ SAMPLER_SALT
}

const SAMPLER_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Always returns `0..n`; training on it reproduces a single full-set model.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySampler;

impl IndexSampler for IdentitySampler {
    fn sample(&mut self, n: usize) -> Vec<usize> {
        (0..n).collect()
    }
}

/// Per-cell statistics over ensemble members.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSpread {
    pub mean: Matrix,
    /// Population standard deviation across members.
    pub std: Matrix,
    pub min: Matrix,
    pub max: Matrix,
}

/// Independently trained models of identical shape.
#[derive(Debug, Clone)]
pub struct Ensemble<M> {
    members: Vec<M>,
    resamples: Vec<Vec<usize>>,
}

impl<M: Regressor> Ensemble<M> {
    /// Train `model_count` members on bootstrap resamples drawn from `seed`.
    ///
    /// Member `i` is initialized with seed `seed + i`; the resampler uses its
    /// own stream derived from `seed` (see [`sampler_seed`]).
    pub fn build<T>(
        data: &Dataset,
        model_count: usize,
        trainer: &T,
        seed: u64,
        reporter: &mut dyn Reporter,
    ) -> Result<Self>
    where
        T: Trainer<Model = M>,
    {
        let mut sampler = BootstrapSampler::new(sampler_seed(seed));
        Self::build_with_sampler(data, model_count, trainer, &mut sampler, seed, reporter)
    }

    /// Like [`Ensemble::build`] with an injected index sampler.
    pub fn build_with_sampler<T, S>(
        data: &Dataset,
        model_count: usize,
        trainer: &T,
        sampler: &mut S,
        seed: u64,
        reporter: &mut dyn Reporter,
    ) -> Result<Self>
    where
        T: Trainer<Model = M>,
        S: IndexSampler + ?Sized,
    {
        if model_count == 0 {
            return Err(Error::InvalidConfig("ensemble needs at least one model".to_owned()));
        }
        if data.is_empty() {
            return Err(Error::EmptyDataset("bootstrap training set has no rows"));
        }
        let n = data.len();
        let mut members = Vec::with_capacity(model_count);
        let mut resamples = Vec::with_capacity(model_count);
        for i in 0..model_count {
            let indices = sampler.sample(n);
            if indices.is_empty() || indices.iter().any(|&idx| idx >= n) {
                return Err(Error::InvalidConfig(format!(
                    "sampler produced an empty or out-of-range resample for {n} rows"
                )));
            }
            log::info!("training ensemble member {}/{}", i + 1, model_count);
            reporter.on_member(i, model_count);
            let resampled = data.select(&indices);
            let mut tagged = MemberReporter {
                inner: &mut *reporter,
                member: i,
            };
            let model = trainer.train_seeded(&resampled, seed.wrapping_add(i as u64), &mut tagged)?;
            members.push(model);
            resamples.push(indices);
        }
        Ok(Self { members, resamples })
    }

    pub fn members(&self) -> &[M] {
        &self.members
    }

    /// Row indices each member was trained on.
    pub fn resamples(&self) -> &[Vec<usize>] {
        &self.resamples
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Every member's prediction, in member order.
    pub fn predict_members(&self, x: &Matrix) -> Result<Vec<Matrix>> {
        let predictions = self
            .members
            .iter()
            .map(|m| m.predict(x))
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = predictions.first() {
            if let Some(odd) = predictions.iter().find(|p| p.shape() != first.shape()) {
                return Err(Error::mismatch("ensemble predict", first.shape(), odd.shape()));
            }
        }
        Ok(predictions)
    }

    /// Mean of the member predictions.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        mean(&self.predict_members(x)?)
    }

    /// Mean, standard deviation, minimum and maximum across members.
    pub fn predict_spread(&self, x: &Matrix) -> Result<PredictionSpread> {
        let predictions = self.predict_members(x)?;
        let mean = mean(&predictions)?;
        let k = predictions.len() as f64;
        let mut var = Matrix::zeros(mean.rows(), mean.cols());
        let mut min = predictions[0].clone();
        let mut max = predictions[0].clone();
        for p in &predictions {
            let diff = p.subtract(&mean)?;
            var = var.add(&diff.hadamard(&diff)?)?;
            min = zip_cells(&min, p, f64::min)?;
            max = zip_cells(&max, p, f64::max)?;
        }
        Ok(PredictionSpread {
            mean,
            std: var.scale(1.0 / k).map(f64::sqrt),
            min,
            max,
        })
    }
}

impl<M: Regressor> Regressor for Ensemble<M> {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        Ensemble::predict(self, x)
    }

    fn output_dim(&self) -> usize {
        self.members.first().map_or(0, |m| m.output_dim())
    }
}

fn mean(predictions: &[Matrix]) -> Result<Matrix> {
    let first = predictions
        .first()
        .ok_or(Error::EmptyDataset("ensemble has no members"))?;
    let mut sum = Matrix::zeros(first.rows(), first.cols());
    for p in predictions {
        sum = sum.add(p)?;
    }
    Ok(sum.scale(1.0 / predictions.len() as f64))
}

fn zip_cells(a: &Matrix, b: &Matrix, f: fn(f64, f64) -> f64) -> Result<Matrix> {
    if a.shape() != b.shape() {
        return Err(Error::mismatch("ensemble spread", a.shape(), b.shape()));
    }
    let data = a.as_slice().iter().zip(b.as_slice()).map(|(&x, &y)| f(x, y)).collect();
    Matrix::from_vec(a.rows(), a.cols(), data)
}
