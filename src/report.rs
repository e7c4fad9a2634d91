//! Progress events emitted by the trainers.
//!
//! The engine never formats output itself; it hands these events to a
//! [`Reporter`]. Printing and JSON sinks live in [`crate::utils`].
use crate::matrix::Matrix;
use serde::Serialize;

/// One finished epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochReport {
    /// Ensemble member index, `None` when training a single model.
    pub member: Option<usize>,
    pub epoch: usize,
    /// RMSE per output column of the errors seen during the epoch.
    pub rmse: Vec<f64>,
}

/// Final state of one trained model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub member: Option<usize>,
    /// Weight matrices, input layer first.
    pub weights: Vec<Matrix>,
    /// Predictions on the (possibly resampled) training inputs, in target units.
    pub predictions: Matrix,
}

/// Sink for training progress. Every method defaults to a no-op.
pub trait Reporter {
    fn on_member(&mut self, _index: usize, _count: usize) {}
    fn on_epoch(&mut self, _report: &EpochReport) {}
    fn on_finish(&mut self, _summary: &TrainingSummary) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub members: Vec<(usize, usize)>,
    pub epochs: Vec<EpochReport>,
    pub summaries: Vec<TrainingSummary>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// RMSE history of one member (or of the single model for `None`).
    pub fn rmse_history(&self, member: Option<usize>) -> Vec<Vec<f64>> {
        self.epochs
            .iter()
            .filter(|e| e.member == member)
            .map(|e| e.rmse.clone())
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn on_member(&mut self, index: usize, count: usize) {
        self.members.push((index, count));
    }
    fn on_epoch(&mut self, report: &EpochReport) {
        self.epochs.push(report.clone());
    }
    fn on_finish(&mut self, summary: &TrainingSummary) {
        self.summaries.push(summary.clone());
    }
}

/// Tags every event with an ensemble member index before forwarding it.
pub(crate) struct MemberReporter<'a> {
    pub(crate) inner: &'a mut dyn Reporter,
    pub(crate) member: usize,
}

impl Reporter for MemberReporter<'_> {
    fn on_member(&mut self, index: usize, count: usize) {
        self.inner.on_member(index, count);
    }
    fn on_epoch(&mut self, report: &EpochReport) {
        let tagged = EpochReport {
            member: Some(self.member),
            ..report.clone()
        };
        self.inner.on_epoch(&tagged);
    }
    fn on_finish(&mut self, summary: &TrainingSummary) {
        let tagged = TrainingSummary {
            member: Some(self.member),
            ..summary.clone()
        };
        self.inner.on_finish(&tagged);
    }
}
