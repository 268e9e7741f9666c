use crate::dataset::{Dataset, ProbabilityVector};
use crate::error::CutoffError;

/// A fitted binary model mapping a feature row to P(positive).
pub trait ProbabilityModel {
    fn predict_probability(&self, features: &[f64]) -> f64;

    /// Probabilities for every record of `rows`, in order.
    fn predict(&self, rows: &Dataset) -> Result<ProbabilityVector, CutoffError> {
        ProbabilityVector::new(
            rows.records()
                .iter()
                .map(|record| self.predict_probability(&record.features))
                .collect(),
        )
    }
}

impl<F> ProbabilityModel for F
where
    F: Fn(&[f64]) -> f64,
{
    fn predict_probability(&self, features: &[f64]) -> f64 {
        self(features)
    }
}

/// Something that can be fitted on a training set.
pub trait Trainer {
    type Model: ProbabilityModel;

    fn fit(&self, train: &Dataset) -> Result<Self::Model, CutoffError>;
}
