//! Stratified train/holdout evaluation of a regularized logistic classifier,
//! and the precision/recall trade-off of its decision threshold.

pub mod classifier;
pub mod config;
pub mod confusion_matrix;
pub mod dataset;
pub mod error;
pub mod gradient_descent;
pub mod parse;
pub mod pipeline;
pub mod plot;
pub mod regularization_path;
pub mod stratified_split;
pub mod threshold_sweep;

pub use classifier::{ProbabilityModel, Trainer};
pub use config::{ExperimentConfig, LoaderConfig};
pub use confusion_matrix::{evaluate, metrics, ConfusionMatrix, Metrics};
pub use dataset::{Dataset, Label, ProbabilityVector, Record};
pub use error::{CutoffError, Metric};
pub use stratified_split::{split, Split};
