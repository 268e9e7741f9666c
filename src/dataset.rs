use std::fmt;
use std::ops::Deref;

use serde::Serialize;

use crate::error::CutoffError;

/// Binary outcome of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Label {
    /// 0, benign
    Negative,
    /// 1, malignant
    Positive,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

    pub fn from_bool(positive: bool) -> Self {
        if positive {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    pub fn is_positive(self) -> bool {
        self == Label::Positive
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Label::Negative => 0.0,
            Label::Positive => 1.0,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Negative => f.write_str("negative"),
            Label::Positive => f.write_str("positive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub features: Vec<f64>,
    pub label: Label,
}

impl Record {
    pub fn new(features: Vec<f64>, label: Label) -> Self {
        Self { features, label }
    }
}

/// An ordered table of records sharing one feature layout.
///
/// Every record has exactly `feature_names.len()` finite features; this is
/// checked once in [`Dataset::new`] and relied on everywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(feature_names: Vec<String>, records: Vec<Record>) -> Result<Self, CutoffError> {
        if feature_names.is_empty() {
            return Err(CutoffError::ZeroFeatures);
        }

        let expected = feature_names.len();
        for (record_index, record) in records.iter().enumerate() {
            if record.features.len() != expected {
                return Err(CutoffError::FeatureCountMismatch {
                    record_index,
                    expected,
                    got: record.features.len(),
                });
            }
            if let Some(feature_index) = record.features.iter().position(|v| !v.is_finite()) {
                return Err(CutoffError::NonFiniteFeature {
                    record_index,
                    feature_index,
                });
            }
        }

        Ok(Self {
            feature_names,
            records,
        })
    }

    /// Builds a dataset with generated names `x0..xN` from feature rows and labels.
    pub fn from_rows(rows: Vec<Vec<f64>>, labels: &[Label]) -> Result<Self, CutoffError> {
        if rows.len() != labels.len() {
            return Err(CutoffError::RowCountMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        let arity = rows.first().map_or(0, Vec::len);
        let feature_names = (0..arity).map(|i| format!("x{i}")).collect();
        let records = rows
            .into_iter()
            .zip(labels)
            .map(|(features, &label)| Record::new(features, label))
            .collect();

        Self::new(feature_names, records)
    }

    /// Rows at `indices`, in the given order, as a new dataset.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn arity(&self) -> usize {
        self.feature_names.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.records.iter().map(|r| r.label).collect()
    }

    pub fn count(&self, label: Label) -> usize {
        self.records.iter().filter(|r| r.label == label).count()
    }

    /// Share of positive records, 0.0 for an empty dataset.
    pub fn positive_rate(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.count(Label::Positive) as f64 / self.records.len() as f64
        }
    }
}

/// Predicted positive-class probabilities, aligned with a dataset's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProbabilityVector(Vec<f64>);

impl ProbabilityVector {
    pub fn new(values: Vec<f64>) -> Result<Self, CutoffError> {
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(CutoffError::ProbabilityOutOfRange { index, value });
        }
        Ok(Self(values))
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for ProbabilityVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_records() {
        let records = vec![
            Record::new(vec![1.0, 2.0], Label::Negative),
            Record::new(vec![1.0], Label::Positive),
        ];
        let err = Dataset::new(vec!["a".into(), "b".into()], records).unwrap_err();
        assert!(matches!(
            err,
            CutoffError::FeatureCountMismatch {
                record_index: 1,
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn rejects_non_finite_features() {
        let records = vec![Record::new(vec![f64::NAN], Label::Negative)];
        let err = Dataset::new(vec!["a".into()], records).unwrap_err();
        assert!(matches!(
            err,
            CutoffError::NonFiniteFeature {
                record_index: 0,
                feature_index: 0
            }
        ));
    }

    #[test]
    fn counts_labels() {
        let ds = Dataset::from_rows(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
            &[Label::Negative, Label::Positive, Label::Negative, Label::Negative],
        )
        .unwrap();
        assert_eq!(ds.count(Label::Negative), 3);
        assert_eq!(ds.count(Label::Positive), 1);
        assert!((ds.positive_rate() - 0.25).abs() < f64::EPSILON);
        assert_eq!(ds.feature_names(), &["x0".to_string()]);
    }

    #[test]
    fn rows_and_labels_must_align() {
        let err = Dataset::from_rows(vec![vec![1.0], vec![2.0]], &[Label::Positive]).unwrap_err();
        assert!(matches!(err, CutoffError::RowCountMismatch { rows: 2, labels: 1 }));
        assert_eq!(err.to_string(), "2 feature rows but 1 labels");
    }

    #[test]
    fn probability_vector_range_checked() {
        assert!(ProbabilityVector::new(vec![0.0, 0.5, 1.0]).is_ok());
        let err = ProbabilityVector::new(vec![0.2, 1.5]).unwrap_err();
        assert!(matches!(err, CutoffError::ProbabilityOutOfRange { index: 1, .. }));
        assert!(ProbabilityVector::new(vec![f64::NAN]).is_err());
    }
}
