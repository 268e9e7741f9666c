use ndarray::{Array1, Array2, Zip};
use tracing::{debug, instrument};

use crate::classifier::{ProbabilityModel, Trainer};
use crate::dataset::{Dataset, Label, ProbabilityVector};
use crate::error::CutoffError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescentSettings {
    pub learning_rate: f64,
    pub max_epochs: usize,
    /// Stop once no coefficient moves more than this in one epoch.
    pub tolerance: f64,
}

impl Default for GradientDescentSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_epochs: 500,
            tolerance: 1e-6,
        }
    }
}

impl GradientDescentSettings {
    pub(crate) fn validate(&self) -> Result<(), CutoffError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(CutoffError::InvalidHyperparameter {
                name: "learning_rate",
                value: self.learning_rate,
                reason: "must be finite and positive",
            });
        }
        if self.max_epochs == 0 {
            return Err(CutoffError::InvalidHyperparameter {
                name: "max_epochs",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(CutoffError::InvalidHyperparameter {
                name: "tolerance",
                value: self.tolerance,
                reason: "must be non-negative",
            });
        }
        Ok(())
    }
}

/// Per-column z-score scaling learned from a training set.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl Standardizer {
    /// Column means and population standard deviations of `dataset`.
    /// Constant columns get a scale of 1 so they map to zero.
    pub fn fit(dataset: &Dataset) -> Self {
        let raw = raw_matrix(dataset);
        let means = raw
            .mean_axis(ndarray::Axis(0))
            .unwrap_or_else(|| Array1::zeros(dataset.arity()));
        let scales = raw
            .std_axis(ndarray::Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        Self { means, scales }
    }

    pub fn transform(&self, dataset: &Dataset) -> Array2<f64> {
        let mut matrix = raw_matrix(dataset);
        for mut row in matrix.rows_mut() {
            row -= &self.means;
            row /= &self.scales;
        }
        matrix
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn scales(&self) -> &Array1<f64> {
        &self.scales
    }
}

fn raw_matrix(dataset: &Dataset) -> Array2<f64> {
    let mut matrix = Array2::zeros((dataset.len(), dataset.arity()));
    for (mut row, record) in matrix.rows_mut().into_iter().zip(dataset.records()) {
        for (cell, &value) in row.iter_mut().zip(&record.features) {
            *cell = value;
        }
    }
    matrix
}

pub(crate) fn targets(dataset: &Dataset) -> Array1<f64> {
    dataset.records().iter().map(|r| r.label.as_f64()).collect()
}

/// Elastic-net penalised logistic regression.
///
/// Minimises mean log-loss plus
/// `lambda * (alpha * |w|_1 + (1 - alpha) / 2 * |w|_2^2)` over standardized
/// features. The intercept is not penalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegression {
    lambda: f64,
    alpha: f64,
    settings: GradientDescentSettings,
}

impl LogisticRegression {
    pub fn new(lambda: f64, alpha: f64, settings: GradientDescentSettings) -> Result<Self, CutoffError> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(CutoffError::InvalidHyperparameter {
                name: "lambda",
                value: lambda,
                reason: "must be finite and non-negative",
            });
        }
        validate_alpha(alpha)?;
        settings.validate()?;
        Ok(Self {
            lambda,
            alpha,
            settings,
        })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

pub(crate) fn validate_alpha(alpha: f64) -> Result<(), CutoffError> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(CutoffError::InvalidHyperparameter {
            name: "alpha",
            value: alpha,
            reason: "must be in [0, 1]",
        })
    }
}

/// Both classes must be present to fit a logistic model.
pub(crate) fn check_trainable(train: &Dataset) -> Result<(), CutoffError> {
    if train.is_empty() {
        return Err(CutoffError::EmptyDataset);
    }
    for label in Label::ALL {
        let count = train.count(label);
        if count == 0 {
            return Err(CutoffError::InsufficientData {
                label,
                count,
                required: 1,
            });
        }
    }
    Ok(())
}

impl Trainer for LogisticRegression {
    type Model = LogisticModel;

    #[instrument(skip_all, fields(n_records = train.len(), lambda = self.lambda))]
    fn fit(&self, train: &Dataset) -> Result<LogisticModel, CutoffError> {
        check_trainable(train)?;

        let standardizer = Standardizer::fit(train);
        let features = standardizer.transform(train);
        let labels = targets(train);

        let mut weights = Array1::zeros(train.arity());
        let mut bias = 0.0;
        let epochs = descend(
            &features,
            &labels,
            self.lambda,
            self.alpha,
            &self.settings,
            &mut weights,
            &mut bias,
        );
        debug!(epochs, "gradient descent finished");

        Ok(LogisticModel {
            standardizer,
            weights,
            bias,
            lambda: self.lambda,
        })
    }
}

/// Proximal gradient descent from the given starting point, updating
/// `weights` and `bias` in place. Returns the number of epochs run.
pub(crate) fn descend(
    features: &Array2<f64>,
    labels: &Array1<f64>,
    lambda: f64,
    alpha: f64,
    settings: &GradientDescentSettings,
    weights: &mut Array1<f64>,
    bias: &mut f64,
) -> usize {
    let n_samples = features.nrows() as f64;
    let learning_rate = settings.learning_rate;
    let l1_step = learning_rate * lambda * alpha;
    let l2 = lambda * (1.0 - alpha);

    for epoch in 0..settings.max_epochs {
        let scores = features.dot(&*weights) + *bias;
        let residuals = scores.mapv(sigmoid) - labels;

        let mut gradient = features.t().dot(&residuals) / n_samples;
        gradient.scaled_add(l2, &*weights);
        let bias_gradient = residuals.sum() / n_samples;

        let mut largest_change: f64 = 0.0;
        Zip::from(&mut *weights).and(&gradient).for_each(|weight, &grad| {
            let updated = soft_threshold(*weight - learning_rate * grad, l1_step);
            largest_change = largest_change.max((updated - *weight).abs());
            *weight = updated;
        });
        let bias_step = learning_rate * bias_gradient;
        *bias -= bias_step;
        largest_change = largest_change.max(bias_step.abs());

        if largest_change < settings.tolerance {
            return epoch + 1;
        }
    }

    settings.max_epochs
}

fn soft_threshold(value: f64, amount: f64) -> f64 {
    if value > amount {
        value - amount
    } else if value < -amount {
        value + amount
    } else {
        0.0
    }
}

pub fn sigmoid(value: f64) -> f64 {
    if value >= 0.0 {
        1.0 / (1.0 + (-value).exp())
    } else {
        let z = value.exp();
        z / (1.0 + z)
    }
}

/// A fitted logistic model over standardized features.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    standardizer: Standardizer,
    weights: Array1<f64>,
    bias: f64,
    lambda: f64,
}

impl LogisticModel {
    pub(crate) fn from_parts(
        standardizer: Standardizer,
        weights: Array1<f64>,
        bias: f64,
        lambda: f64,
    ) -> Self {
        Self {
            standardizer,
            weights,
            bias,
            lambda,
        }
    }

    /// Weights on the standardized scale.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn standardizer(&self) -> &Standardizer {
        &self.standardizer
    }

    pub fn nonzero_weights(&self) -> usize {
        self.weights.iter().filter(|w| **w != 0.0).count()
    }

    /// Weights and intercept on the original feature scale.
    pub fn coefficients(&self) -> (Vec<f64>, f64) {
        let weights = &self.weights / self.standardizer.scales();
        let intercept = self.bias - weights.dot(self.standardizer.means());
        (weights.to_vec(), intercept)
    }

    /// Rejects a dataset whose feature count differs from the one the model was fitted on.
    pub(crate) fn check_arity(&self, rows: &Dataset) -> Result<(), CutoffError> {
        if rows.arity() == self.weights.len() {
            Ok(())
        } else {
            Err(CutoffError::ArityMismatch {
                expected: self.weights.len(),
                got: rows.arity(),
            })
        }
    }
}

impl ProbabilityModel for LogisticModel {
    fn predict_probability(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.weights.len());
        let score = features
            .iter()
            .zip(self.standardizer.means())
            .zip(self.standardizer.scales())
            .zip(&self.weights)
            .map(|(((x, mean), scale), w)| (x - mean) / scale * w)
            .sum::<f64>()
            + self.bias;
        sigmoid(score)
    }

    fn predict(&self, rows: &Dataset) -> Result<ProbabilityVector, CutoffError> {
        self.check_arity(rows)?;
        ProbabilityVector::new(
            rows.records()
                .iter()
                .map(|record| self.predict_probability(&record.features))
                .collect(),
        )
    }
}
