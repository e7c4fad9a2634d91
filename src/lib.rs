//! A small numeric training engine for educational regression experiments:
//! matrices, standardization, online linear models, shallow tanh networks,
//! and bootstrap ensembles.
//!
//! - Linear model with online delta-rule updates and an optional output unit
//! - Two-layer tanh network, full-batch or per-sample backpropagation
//! - Bootstrap ensembles with mean prediction and member spread
//! - CSV ingestion, train/test split, and synthetic datasets for the demos
//! - Progress reporting through a pluggable sink

pub mod activations;
pub mod config;
pub mod datasets;
pub mod ensemble;
pub mod error;
pub mod linear;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod pipeline;
pub mod report;
pub mod standardize;
pub mod utils;

pub use activations::{Activation, ActivationKind, Identity, Sigmoid, Tanh};
pub use config::{TrainingConfig, UpdateRegime};
pub use datasets::{polynomial_features, CsvSource, DataSource, Dataset};
pub use ensemble::{BootstrapSampler, Ensemble, IdentitySampler, IndexSampler, PredictionSpread, Regressor, Trainer};
pub use error::{Error, IngestError, Result};
pub use linear::{LinearModel, LinearTrainer};
pub use matrix::Matrix;
pub use metrics::{rmse, RmseAccumulator};
pub use network::{ShallowModel, ShallowNetwork, ShallowTrainer};
pub use pipeline::{fit, FittedModel};
pub use report::{EpochReport, NullReporter, RecordingReporter, Reporter, TrainingSummary};
pub use standardize::StandardizationStats;
pub use utils::{print_summary_table, ConsoleReporter, JsonLinesReporter};
