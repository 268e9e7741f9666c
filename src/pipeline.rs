//! Split, fit, predict and evaluate in one call.

use serde::Serialize;
use tracing::{info, instrument};

use crate::classifier::{ProbabilityModel, Trainer};
use crate::config::ExperimentConfig;
use crate::dataset::{Dataset, Label, ProbabilityVector};
use crate::error::CutoffError;
use crate::stratified_split::split;
use crate::threshold_sweep::{linspace, sweep, ThresholdReport};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PartitionSummary {
    pub records: usize,
    pub negatives: usize,
    pub positives: usize,
}

impl PartitionSummary {
    fn of(dataset: &Dataset) -> Self {
        Self {
            records: dataset.len(),
            negatives: dataset.count(Label::Negative),
            positives: dataset.count(Label::Positive),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub seed: u64,
    pub train_fraction: f64,
    pub train: PartitionSummary,
    pub holdout: PartitionSummary,
    pub holdout_indices: Vec<usize>,
    pub probabilities: ProbabilityVector,
    /// One entry per configured threshold.
    pub thresholds: Vec<ThresholdReport>,
    /// Evenly spaced thresholds over [0, 1] for the curve.
    pub curve: Vec<ThresholdReport>,
}

/// The fitted model together with its evaluation.
#[derive(Debug)]
pub struct Experiment<M> {
    pub model: M,
    pub report: ExperimentReport,
}

/// Runs split -> fit -> predict -> evaluate on `dataset`.
#[instrument(skip_all, fields(n_records = dataset.len(), seed = config.seed()))]
pub fn run<T: Trainer>(
    dataset: &Dataset,
    config: &ExperimentConfig,
    trainer: &T,
) -> Result<Experiment<T::Model>, CutoffError> {
    let split = split(dataset, config.train_fraction(), config.seed())?;
    info!(
        train = split.train.len(),
        holdout = split.holdout.len(),
        "partitioned dataset"
    );

    let model = trainer.fit(&split.train)?;
    let probabilities = model.predict(&split.holdout)?;
    let truth = split.holdout.labels();

    let thresholds = sweep(&probabilities, &truth, config.thresholds())?;
    for report in &thresholds {
        info!(
            threshold = report.threshold,
            tp = report.matrix.tp,
            fp = report.matrix.fp,
            tn = report.matrix.tn,
            fn_ = report.matrix.fn_,
            precision = ?report.precision,
            recall = ?report.recall,
            "evaluated threshold"
        );
    }
    let curve = sweep(&probabilities, &truth, &linspace(0.0, 1.0, config.sweep_steps())?)?;

    Ok(Experiment {
        model,
        report: ExperimentReport {
            seed: config.seed(),
            train_fraction: config.train_fraction(),
            train: PartitionSummary::of(&split.train),
            holdout: PartitionSummary::of(&split.holdout),
            holdout_indices: split.holdout_indices,
            probabilities,
            thresholds,
            curve,
        },
    })
}
