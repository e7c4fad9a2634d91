//! Error taxonomy shared by every training and evaluation entry point.
use std::io;
use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a train / predict / evaluate call.
///
/// None of these are recoverable inside the engine: the caller decides whether
/// to retry with corrected input.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operand shapes are incompatible for the requested operation.
    #[error("dimension mismatch in {op}: left is {left:?}, right is {right:?}")]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A feature column has zero (or non-finite) standard deviation.
    #[error("column {column} has zero standard deviation and cannot be standardized")]
    DegenerateColumn { column: usize },

    /// Zero rows were passed where at least one sample is required.
    #[error("empty dataset: {0}")]
    EmptyDataset(&'static str),

    /// Failure surfaced unchanged from a data source.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A training option is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors produced while reading tabular data.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: column {column} has {found} fields, need at least {needed}")]
    ShortRow {
        path: PathBuf,
        line: u64,
        column: usize,
        found: usize,
        needed: usize,
    },

    #[error("{path}:{line}: column {column}: cannot parse {value:?} as a number")]
    Parse {
        path: PathBuf,
        line: u64,
        column: usize,
        value: String,
    },

    #[error("invalid column range {first}..={last}")]
    ColumnRange { first: usize, last: usize },
}

impl Error {
    pub(crate) fn mismatch(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        Error::DimensionMismatch { op, left, right }
    }
}
