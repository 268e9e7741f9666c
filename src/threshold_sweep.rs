//! Evaluating one set of probabilities at many thresholds.

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use crate::confusion_matrix::{evaluate, ConfusionMatrix};
use crate::dataset::Label;
use crate::error::CutoffError;

/// Outcome at one threshold. `None` metrics had a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdReport {
    pub threshold: f64,
    pub matrix: ConfusionMatrix,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
}

impl ThresholdReport {
    pub fn from_matrix(threshold: f64, matrix: ConfusionMatrix) -> Self {
        Self {
            threshold,
            matrix,
            precision: matrix.precision().ok(),
            recall: matrix.recall().ok(),
        }
    }
}

/// Evaluates every threshold independently against the same probabilities.
#[instrument(skip_all, fields(n_thresholds = thresholds.len(), n_records = probabilities.len()))]
pub fn sweep(
    probabilities: &[f64],
    true_labels: &[Label],
    thresholds: &[f64],
) -> Result<Vec<ThresholdReport>, CutoffError> {
    thresholds
        .iter()
        .map(|&threshold| {
            evaluate(probabilities, true_labels, threshold)
                .map(|matrix| ThresholdReport::from_matrix(threshold, matrix))
        })
        .collect()
}

/// `steps` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, steps: usize) -> Result<Vec<f64>, CutoffError> {
    if steps < 2 {
        return Err(CutoffError::InvalidThreshold {
            reason: format!("need at least 2 steps, got {steps}"),
        });
    }
    if !start.is_finite() || !end.is_finite() || start >= end {
        return Err(CutoffError::InvalidThreshold {
            reason: format!("expected finite start < end, got {start}..{end}"),
        });
    }
    let width = end - start;
    Ok((0..steps)
        .map(|i| start + width * i as f64 / (steps - 1) as f64)
        .collect())
}

#[derive(Serialize)]
struct CsvRow {
    threshold: f64,
    tp: usize,
    fp: usize,
    tn: usize,
    #[serde(rename = "fn")]
    fn_: usize,
    precision: Option<f64>,
    recall: Option<f64>,
}

/// Writes one CSV row per report; undefined metrics are left empty.
pub fn write_csv(path: &Path, reports: &[ThresholdReport]) -> Result<(), CutoffError> {
    let csv_error = |source| CutoffError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for report in reports {
        writer
            .serialize(CsvRow {
                threshold: report.threshold,
                tp: report.matrix.tp,
                fp: report.matrix.fp,
                tn: report.matrix.tn,
                fn_: report.matrix.fn_,
                precision: report.precision,
                recall: report.recall,
            })
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|source| CutoffError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), rows = reports.len(), "wrote threshold sweep");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_matches_individual_evaluations() {
        let probabilities = [0.95, 0.85, 0.3, 0.05];
        let labels = [Label::Positive, Label::Negative, Label::Negative, Label::Negative];
        let reports = sweep(&probabilities, &labels, &[0.1, 0.9]).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].matrix.fp, 2);
        assert!((reports[0].precision.unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(reports[1].matrix.fp, 0);
        assert_eq!(reports[1].precision, Some(1.0));
    }

    #[test]
    fn undefined_metrics_become_none() {
        let reports = sweep(&[0.2, 0.3], &[Label::Negative, Label::Negative], &[0.1]).unwrap();
        assert_eq!(reports[0].recall, None);
        assert_eq!(reports[0].precision, Some(0.0));
    }

    #[test]
    fn sweep_propagates_mismatch() {
        let err = sweep(&[0.2], &[], &[0.5]).unwrap_err();
        assert!(matches!(err, CutoffError::DimensionMismatch { .. }));
    }

    #[test]
    fn linspace_endpoints() {
        let values = linspace(0.0, 1.0, 11).unwrap();
        assert_eq!(values.len(), 11);
        assert!(values[0].abs() < f64::EPSILON);
        assert!((values[10] - 1.0).abs() < f64::EPSILON);
        assert!((values[3] - 0.3).abs() < 1e-12);
        assert!(linspace(0.0, 1.0, 1).is_err());
        assert!(linspace(1.0, 0.0, 5).is_err());
    }

    #[test]
    fn csv_leaves_undefined_cells_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.csv");
        let reports = sweep(&[0.2, 0.3], &[Label::Negative, Label::Negative], &[0.1, 0.5]).unwrap();
        write_csv(&path, &reports).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("threshold,tp,fp,tn,fn,precision,recall"));
        assert_eq!(lines.next(), Some("0.1,0,2,0,0,0.0,"));
        assert_eq!(lines.next(), Some("0.5,0,0,2,0,,"));
    }
}
