//! One-call training from a [`TrainingConfig`].
//!
//! `hidden_units == 0` selects the linear trainer, anything else the shallow
//! network; `model_count > 1` wraps either one in a bootstrap ensemble.
use crate::config::TrainingConfig;
use crate::datasets::Dataset;
use crate::ensemble::{Ensemble, Regressor};
use crate::error::Result;
use crate::linear::{LinearModel, LinearTrainer};
use crate::matrix::Matrix;
use crate::metrics::rmse;
use crate::network::{ShallowModel, ShallowTrainer};
use crate::report::Reporter;

/// Whatever [`fit`] produced.
#[derive(Debug, Clone)]
pub enum FittedModel {
    Linear(LinearModel),
    Shallow(ShallowModel),
    LinearEnsemble(Ensemble<LinearModel>),
    ShallowEnsemble(Ensemble<ShallowModel>),
}

impl FittedModel {
    pub fn kind(&self) -> &'static str {
        match self {
            FittedModel::Linear(_) => "linear",
            FittedModel::Shallow(_) => "shallow network",
            FittedModel::LinearEnsemble(_) => "linear ensemble",
            FittedModel::ShallowEnsemble(_) => "shallow network ensemble",
        }
    }

    /// Number of trained models behind this one.
    pub fn model_count(&self) -> usize {
        match self {
            FittedModel::Linear(_) | FittedModel::Shallow(_) => 1,
            FittedModel::LinearEnsemble(e) => e.len(),
            FittedModel::ShallowEnsemble(e) => e.len(),
        }
    }

    /// Per-column RMSE on a held-out set.
    pub fn evaluate(&self, data: &Dataset) -> Result<Vec<f64>> {
        rmse(&self.predict(data.x())?, data.t())
    }
}

impl Regressor for FittedModel {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        match self {
            FittedModel::Linear(m) => m.predict(x),
            FittedModel::Shallow(m) => m.predict(x),
            FittedModel::LinearEnsemble(e) => e.predict(x),
            FittedModel::ShallowEnsemble(e) => e.predict(x),
        }
    }

    fn output_dim(&self) -> usize {
        match self {
            FittedModel::Linear(m) => m.output_dim(),
            FittedModel::Shallow(m) => m.output_dim(),
            FittedModel::LinearEnsemble(e) => e.output_dim(),
            FittedModel::ShallowEnsemble(e) => e.output_dim(),
        }
    }
}

/// Validate `config` and train the model it describes on `data`.
pub fn fit(data: &Dataset, config: &TrainingConfig, reporter: &mut dyn Reporter) -> Result<FittedModel> {
    config.validate()?;
    let model = match (config.hidden_units, config.model_count) {
        (0, 1) => FittedModel::Linear(LinearTrainer::from_config(config).train(data, reporter)?),
        (0, k) => FittedModel::LinearEnsemble(Ensemble::build(
            data,
            k,
            &LinearTrainer::from_config(config),
            config.seed,
            reporter,
        )?),
        (_, 1) => FittedModel::Shallow(ShallowTrainer::from_config(config).train(data, config.seed, reporter)?),
        (_, k) => FittedModel::ShallowEnsemble(Ensemble::build(
            data,
            k,
            &ShallowTrainer::from_config(config),
            config.seed,
            reporter,
        )?),
    };
    log::debug!("fitted {} ({} models)", model.kind(), model.model_count());
    Ok(model)
}
