//! Training options shared by every trainer.
use crate::activations::ActivationKind;
use crate::error::{Error, IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the shallow network applies its updates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRegime {
    /// One simultaneous update of both layers per epoch from the whole set.
    #[default]
    FullBatch,
    /// One update per training row, in dataset order.
    PerSample,
}

/// Configuration for training a model or an ensemble of models.
///
/// Missing fields in JSON fall back to [`TrainingConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Step size of the linear model, the per-sample network, and the
    /// full-batch output layer.
    pub learning_rate: f64,
    /// Step size of the full-batch hidden layer; `None` reuses `learning_rate`.
    pub hidden_learning_rate: Option<f64>,
    pub epoch_count: usize,
    /// Hidden tanh units; 0 trains a linear model.
    pub hidden_units: usize,
    /// Bootstrap members; 1 trains a single model on the full set.
    pub model_count: usize,
    pub seed: u64,
    pub regime: UpdateRegime,
    /// Output unit of the linear model.
    pub activation: ActivationKind,
    /// Standardize targets as well as inputs (predictions are mapped back).
    pub standardize_targets: bool,
    /// Initial network weights are drawn from `[-weight_scale, weight_scale)`.
    pub weight_scale: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            hidden_learning_rate: None,
            epoch_count: 100,
            hidden_units: 0,
            model_count: 1,
            seed: 42,
            regime: UpdateRegime::FullBatch,
            activation: ActivationKind::Identity,
            standardize_targets: false,
            weight_scale: 0.1,
        }
    }
}

impl TrainingConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file and validate.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Effective hidden-layer rate of the full-batch regime.
    pub fn hidden_rate(&self) -> f64 {
        self.hidden_learning_rate.unwrap_or(self.learning_rate)
    }

    pub fn validate(&self) -> Result<()> {
        check_rate("learning_rate", self.learning_rate)?;
        if let Some(rate) = self.hidden_learning_rate {
            check_rate("hidden_learning_rate", rate)?;
        }
        if self.epoch_count == 0 {
            return Err(Error::InvalidConfig("epoch_count must be > 0".to_owned()));
        }
        if self.model_count == 0 {
            return Err(Error::InvalidConfig("model_count must be > 0".to_owned()));
        }
        if !(self.weight_scale.is_finite() && self.weight_scale > 0.0) {
            return Err(Error::InvalidConfig(
                "weight_scale must be finite and > 0".to_owned(),
            ));
        }
        Ok(())
    }
}

fn check_rate(name: &str, rate: f64) -> Result<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} must be finite and > 0, got {rate}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TrainingConfig::default().validate().unwrap();
    }

    #[test]
    fn json_fills_missing_fields() {
        let cfg = TrainingConfig::from_json_str(
            r#"{"learning_rate": 0.05, "hidden_units": 20, "regime": "per_sample", "activation": "tanh"}"#,
        )
        .unwrap();
        assert_eq!(cfg.learning_rate, 0.05);
        assert_eq!(cfg.hidden_units, 20);
        assert_eq!(cfg.regime, UpdateRegime::PerSample);
        assert_eq!(cfg.activation, ActivationKind::Tanh);
        assert_eq!(cfg.model_count, 1);
        assert_eq!(cfg.hidden_rate(), 0.05);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            r#"{"learning_rate": 0.0}"#,
            r#"{"learning_rate": -1.0}"#,
            r#"{"hidden_learning_rate": 0.0}"#,
            r#"{"epoch_count": 0}"#,
            r#"{"model_count": 0}"#,
            r#"{"weight_scale": 0.0}"#,
            r#"{"regime": "sideways"}"#,
            r#"not json"#,
        ];
        for json in bad {
            assert!(
                matches!(TrainingConfig::from_json_str(json), Err(Error::InvalidConfig(_))),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn missing_file_is_an_ingest_error() {
        let err = TrainingConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Ingest(IngestError::Io { .. })));
    }
}
