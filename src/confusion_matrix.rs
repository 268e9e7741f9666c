//! Threshold classification and binary confusion-matrix metrics.

use std::fmt;

use serde::Serialize;

use crate::dataset::Label;
use crate::error::{CutoffError, Metric};

/// Counts of predicted vs. actual outcomes at one threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

/// Precision and recall of one matrix; `Err` marks a zero denominator.
#[derive(Debug)]
pub struct Metrics {
    pub precision: Result<f64, CutoffError>,
    pub recall: Result<f64, CutoffError>,
}

/// Classifies each probability against `threshold` and tallies the outcomes.
///
/// A record is predicted positive only when its probability is strictly
/// greater than `threshold`; a tie classifies as negative. Thresholds outside
/// [0, 1] are accepted and yield all-positive or all-negative predictions.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CutoffError::DimensionMismatch`] | `probabilities` and `true_labels` differ in length |
pub fn evaluate(
    probabilities: &[f64],
    true_labels: &[Label],
    threshold: f64,
) -> Result<ConfusionMatrix, CutoffError> {
    if probabilities.len() != true_labels.len() {
        return Err(CutoffError::DimensionMismatch {
            probabilities: probabilities.len(),
            labels: true_labels.len(),
        });
    }

    let mut matrix = ConfusionMatrix::default();
    for (&probability, &label) in probabilities.iter().zip(true_labels) {
        let predicted = probability > threshold;
        match (predicted, label) {
            (true, Label::Positive) => matrix.tp += 1,
            (true, Label::Negative) => matrix.fp += 1,
            (false, Label::Negative) => matrix.tn += 1,
            (false, Label::Positive) => matrix.fn_ += 1,
        }
    }

    Ok(matrix)
}

/// Precision and recall of `matrix`.
pub fn metrics(matrix: &ConfusionMatrix) -> Metrics {
    Metrics {
        precision: matrix.precision(),
        recall: matrix.recall(),
    }
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn predicted_positives(&self) -> usize {
        self.tp + self.fp
    }

    pub fn actual_positives(&self) -> usize {
        self.tp + self.fn_
    }

    /// TP / (TP + FP).
    pub fn precision(&self) -> Result<f64, CutoffError> {
        ratio(self.tp, self.predicted_positives(), Metric::Precision)
    }

    /// TP / (TP + FN).
    pub fn recall(&self) -> Result<f64, CutoffError> {
        ratio(self.tp, self.actual_positives(), Metric::Recall)
    }

    pub fn accuracy(&self) -> Result<f64, CutoffError> {
        ratio(self.tp + self.tn, self.total(), Metric::Accuracy)
    }

    /// Harmonic mean of precision and recall; undefined if either is, or if
    /// both are zero.
    pub fn f1(&self) -> Result<f64, CutoffError> {
        let precision = self.precision()?;
        let recall = self.recall()?;
        if precision + recall == 0.0 {
            return Err(CutoffError::UndefinedMetric { metric: Metric::F1 });
        }
        Ok(2.0 * precision * recall / (precision + recall))
    }
}

fn ratio(numerator: usize, denominator: usize, metric: Metric) -> Result<f64, CutoffError> {
    if denominator == 0 {
        Err(CutoffError::UndefinedMetric { metric })
    } else {
        Ok(numerator as f64 / denominator as f64)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10} {:>8} {:>8}", "", "pred_0", "pred_1")?;
        writeln!(f, "{:>10} {:>8} {:>8}", "true_0", self.tn, self.fp)?;
        writeln!(f, "{:>10} {:>8} {:>8}", "true_1", self.fn_, self.tp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Label = Label::Positive;
    const N: Label = Label::Negative;

    fn labels(bits: &[u8]) -> Vec<Label> {
        bits.iter().map(|&b| Label::from_bool(b == 1)).collect()
    }

    #[test]
    fn high_threshold_scenario() {
        let probabilities = [0.95, 0.85, 0.3, 0.05];
        let cm = evaluate(&probabilities, &labels(&[1, 0, 0, 0]), 0.9).unwrap();
        assert_eq!(
            cm,
            ConfusionMatrix {
                tp: 1,
                fp: 0,
                tn: 3,
                fn_: 0
            }
        );
        assert!((cm.precision().unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((cm.recall().unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn low_threshold_scenario() {
        let probabilities = [0.95, 0.85, 0.3, 0.05];
        let cm = evaluate(&probabilities, &labels(&[1, 0, 0, 0]), 0.1).unwrap();
        assert_eq!(
            cm,
            ConfusionMatrix {
                tp: 1,
                fp: 2,
                tn: 1,
                fn_: 0
            }
        );
        let m = metrics(&cm);
        assert!((m.precision.unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!((m.recall.unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recall_undefined_without_positives() {
        let cm = evaluate(&[0.2, 0.3], &[N, N], 0.25).unwrap();
        assert_eq!(cm.tp, 0);
        assert!(cm.fp >= 1);
        assert_eq!(cm.fn_, 0);
        assert!(matches!(
            cm.recall(),
            Err(CutoffError::UndefinedMetric {
                metric: Metric::Recall
            })
        ));
        // Defined and zero, not undefined.
        assert!(cm.precision().unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn precision_undefined_without_predictions() {
        let cm = evaluate(&[0.2, 0.8], &[P, N], 0.9).unwrap();
        assert_eq!(cm.predicted_positives(), 0);
        assert!(matches!(
            cm.precision(),
            Err(CutoffError::UndefinedMetric {
                metric: Metric::Precision
            })
        ));
        assert!(cm.recall().unwrap().abs() < f64::EPSILON);
        assert!(cm.f1().is_err());
    }

    #[test]
    fn tie_classifies_negative() {
        let cm = evaluate(&[0.5], &[P], 0.5).unwrap();
        assert_eq!(cm.fn_, 1);
        assert_eq!(cm.tp, 0);
    }

    #[test]
    fn out_of_range_thresholds() {
        let probabilities = [0.0, 0.4, 1.0];
        let truth = [N, P, P];
        let all_positive = evaluate(&probabilities, &truth, -0.5).unwrap();
        assert_eq!(all_positive.predicted_positives(), 3);
        let all_negative = evaluate(&probabilities, &truth, 1.5).unwrap();
        assert_eq!(all_negative.predicted_positives(), 0);
    }

    #[test]
    fn counts_sum_and_monotone() {
        let probabilities: Vec<f64> = (0..50).map(|i| ((i * 37) % 50) as f64 / 49.0).collect();
        let truth: Vec<Label> = (0..50).map(|i| Label::from_bool(i % 4 == 0)).collect();

        let mut previous = usize::MAX;
        for step in 0..=20 {
            let threshold = step as f64 / 20.0;
            let cm = evaluate(&probabilities, &truth, threshold).unwrap();
            assert_eq!(cm.total(), probabilities.len());
            assert!(cm.predicted_positives() <= previous);
            previous = cm.predicted_positives();
        }
    }

    #[test]
    fn length_mismatch() {
        let err = evaluate(&[0.1, 0.2], &[P], 0.5).unwrap_err();
        assert!(matches!(
            err,
            CutoffError::DimensionMismatch {
                probabilities: 2,
                labels: 1
            }
        ));
    }

    #[test]
    fn accuracy_and_f1() {
        let cm = ConfusionMatrix {
            tp: 3,
            fp: 1,
            tn: 4,
            fn_: 2,
        };
        assert!((cm.accuracy().unwrap() - 0.7).abs() < 1e-12);
        // p = 0.75, r = 0.6
        assert!((cm.f1().unwrap() - 2.0 * 0.75 * 0.6 / 1.35).abs() < 1e-12);
        assert!(ConfusionMatrix::default().accuracy().is_err());
    }

    #[test]
    fn display_layout() {
        let cm = ConfusionMatrix {
            tp: 1,
            fp: 2,
            tn: 3,
            fn_: 4,
        };
        let output = cm.to_string();
        assert!(output.contains("pred_1"));
        assert!(output.contains("true_0"));
        assert_eq!(output.lines().count(), 3);
    }
}
