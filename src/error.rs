use std::fmt;
use std::path::PathBuf;

use crate::dataset::Label;

/// Which rate could not be computed from a confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Precision,
    Recall,
    Accuracy,
    F1,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::Accuracy => "accuracy",
            Metric::F1 => "f1",
        };
        f.write_str(name)
    }
}

/// Errors from loading, partitioning, fitting and evaluating.
#[derive(Debug, thiserror::Error)]
pub enum CutoffError {
    /// Returned when a split fraction is not strictly inside (0, 1).
    #[error("fraction must be in (0, 1), got {fraction}")]
    InvalidFraction { fraction: f64 },

    /// Returned when a label class cannot populate both sides of a partition.
    #[error("class {label} has {count} records, need at least {required}")]
    InsufficientData {
        label: Label,
        count: usize,
        required: usize,
    },

    /// Returned when probabilities and labels are not aligned.
    #[error("{probabilities} probabilities but {labels} labels")]
    DimensionMismatch { probabilities: usize, labels: usize },

    /// Returned when a rate has a zero denominator.
    #[error("{metric} is undefined: zero denominator")]
    UndefinedMetric { metric: Metric },

    #[error("dataset has zero records")]
    EmptyDataset,

    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    #[error("record {record_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        record_index: usize,
        expected: usize,
        got: usize,
    },

    #[error("{rows} feature rows but {labels} labels")]
    RowCountMismatch { rows: usize, labels: usize },

    #[error("model was fitted on {expected} features, dataset has {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("non-finite value at record {record_index}, feature {feature_index}")]
    NonFiniteFeature {
        record_index: usize,
        feature_index: usize,
    },

    #[error("probability at index {index} is {value}, expected a value in [0, 1]")]
    ProbabilityOutOfRange { index: usize, value: f64 },

    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount { n_folds: usize },

    #[error("class {label} has only {count} records, need at least {n_folds} for {n_folds}-fold CV")]
    TooFewSamplesForFolds {
        label: Label,
        count: usize,
        n_folds: usize,
    },

    #[error("invalid {name}: {value} ({reason})")]
    InvalidHyperparameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid threshold range: {reason}")]
    InvalidThreshold { reason: String },

    #[error("cannot open {path}")]
    FileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        path: PathBuf,
        offset: u64,
        source: csv::Error,
    },

    #[error("column \"{column}\" not found in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("unknown label \"{raw}\" in {path} at row {row}")]
    UnknownLabel {
        path: PathBuf,
        row: usize,
        raw: String,
    },

    #[error("invalid value \"{raw}\" in {path}: row {row}, column \"{column}\"")]
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: String,
        raw: String,
    },

    #[error("row {row} in {path} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        path: PathBuf,
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("cannot write {path}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV write error for {path}")]
    CsvWrite {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("failed to draw {path}: {reason}")]
    Plot { path: PathBuf, reason: String },
}
