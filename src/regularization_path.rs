//! Cross-validated choice of the penalty strength along a single lambda path.

use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::classifier::{ProbabilityModel, Trainer};
use crate::dataset::{Dataset, ProbabilityVector};
use crate::error::CutoffError;
use crate::gradient_descent::{
    check_trainable, descend, sigmoid, targets, validate_alpha, GradientDescentSettings,
    LogisticModel, Standardizer,
};
use crate::stratified_split::assign_folds;

/// How to pick a lambda from the cross-validation curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionRule {
    /// Lambda with the lowest mean held-out deviance.
    Minimum,
    /// Largest lambda whose mean deviance is within one standard error of the
    /// minimum.
    OneStandardError,
}

/// Path and cross-validation parameters.
///
/// # Defaults
///
/// | Parameter   | Default            |
/// |-------------|--------------------|
/// | `n_lambdas` | 30                 |
/// | `min_ratio` | 1e-3               |
/// | `n_folds`   | 5                  |
/// | `alpha`     | 1.0 (lasso)        |
/// | `seed`      | 42                 |
/// | `rule`      | `OneStandardError` |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSettings {
    pub n_lambdas: usize,
    pub min_ratio: f64,
    pub n_folds: usize,
    pub alpha: f64,
    pub seed: u64,
    pub rule: SelectionRule,
    pub descent: GradientDescentSettings,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            n_lambdas: 30,
            min_ratio: 1e-3,
            n_folds: 5,
            alpha: 1.0,
            seed: 42,
            rule: SelectionRule::OneStandardError,
            descent: GradientDescentSettings::default(),
        }
    }
}

/// Cross-validation summary for one lambda.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathPoint {
    pub lambda: f64,
    pub mean_deviance: f64,
    pub std_error: f64,
    /// Non-zero weights when fitted on the full training set.
    pub nonzero: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathFit {
    pub points: Vec<PathPoint>,
    pub lambda_min: f64,
    pub lambda_1se: f64,
    pub rule: SelectionRule,
    pub selected_lambda: f64,
}

/// Logistic regression whose lambda is chosen by stratified k-fold CV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossValidatedLogistic {
    settings: PathSettings,
}

/// The full-data fit at the selected lambda, plus the path that chose it.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidatedModel {
    pub model: LogisticModel,
    pub path: PathFit,
}

impl ProbabilityModel for CrossValidatedModel {
    fn predict_probability(&self, features: &[f64]) -> f64 {
        self.model.predict_probability(features)
    }

    fn predict(&self, rows: &Dataset) -> Result<ProbabilityVector, CutoffError> {
        self.model.predict(rows)
    }
}

impl CrossValidatedLogistic {
    pub fn new(settings: PathSettings) -> Result<Self, CutoffError> {
        if settings.n_lambdas == 0 {
            return Err(CutoffError::InvalidHyperparameter {
                name: "n_lambdas",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if settings.min_ratio.is_nan() || settings.min_ratio <= 0.0 || settings.min_ratio >= 1.0 {
            return Err(CutoffError::InvalidHyperparameter {
                name: "min_ratio",
                value: settings.min_ratio,
                reason: "must be in (0, 1)",
            });
        }
        if settings.n_folds < 2 {
            return Err(CutoffError::InvalidFoldCount {
                n_folds: settings.n_folds,
            });
        }
        validate_alpha(settings.alpha)?;
        settings.descent.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &PathSettings {
        &self.settings
    }
}

impl Trainer for CrossValidatedLogistic {
    type Model = CrossValidatedModel;

    #[instrument(skip_all, fields(n_records = train.len(), n_folds = self.settings.n_folds))]
    fn fit(&self, train: &Dataset) -> Result<CrossValidatedModel, CutoffError> {
        check_trainable(train)?;
        let settings = &self.settings;

        let standardizer = Standardizer::fit(train);
        let features = standardizer.transform(train);
        let labels = targets(train);
        let lambdas = lambda_path(&features, &labels, settings.alpha, settings.n_lambdas, settings.min_ratio);

        let deviances = cross_validate(train, &lambdas, settings)?;
        let (means, std_errors): (Vec<f64>, Vec<f64>) =
            deviances.iter().map(|d| mean_and_std_error(d)).unzip();

        let best = argmin(&means);
        let within = means[best] + std_errors[best];
        let one_se = means.iter().position(|&m| m <= within).unwrap_or(best);
        let selected = match settings.rule {
            SelectionRule::Minimum => best,
            SelectionRule::OneStandardError => one_se,
        };

        // Full-data path with warm starts.
        let mut weights = Array1::zeros(train.arity());
        let mut bias = 0.0;
        let mut points = Vec::with_capacity(lambdas.len());
        let mut chosen = None;
        for (k, &lambda) in lambdas.iter().enumerate() {
            descend(
                &features,
                &labels,
                lambda,
                settings.alpha,
                &settings.descent,
                &mut weights,
                &mut bias,
            );
            let nonzero = weights.iter().filter(|w| **w != 0.0).count();
            debug!(lambda, mean_deviance = means[k], std_error = std_errors[k], nonzero, "path point");
            points.push(PathPoint {
                lambda,
                mean_deviance: means[k],
                std_error: std_errors[k],
                nonzero,
            });
            if k == selected {
                chosen = Some((weights.clone(), bias));
            }
        }

        let (weights, bias) = chosen.unwrap_or((weights, bias));
        let selected_lambda = lambdas[selected];
        info!(
            lambda_min = lambdas[best],
            lambda_1se = lambdas[one_se],
            selected_lambda,
            "regularization path complete"
        );

        Ok(CrossValidatedModel {
            model: LogisticModel::from_parts(standardizer, weights, bias, selected_lambda),
            path: PathFit {
                points,
                lambda_min: lambdas[best],
                lambda_1se: lambdas[one_se],
                rule: settings.rule,
                selected_lambda,
            },
        })
    }
}

/// Decreasing geometric sequence from the smallest lambda that zeroes every
/// weight down to `lambda_max * min_ratio`.
pub(crate) fn lambda_path(
    features: &Array2<f64>,
    labels: &Array1<f64>,
    alpha: f64,
    n_lambdas: usize,
    min_ratio: f64,
) -> Vec<f64> {
    let n_samples = features.nrows() as f64;
    let mean = labels.mean().unwrap_or(0.0);
    let centered = labels - mean;
    let largest = features
        .t()
        .dot(&centered)
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let lambda_max = (largest / (n_samples * alpha.max(1e-3))).max(f64::EPSILON);

    if n_lambdas == 1 {
        return vec![lambda_max];
    }
    (0..n_lambdas)
        .map(|k| lambda_max * min_ratio.powf(k as f64 / (n_lambdas - 1) as f64))
        .collect()
}

/// Held-out deviance per lambda (outer) and fold (inner).
fn cross_validate(
    train: &Dataset,
    lambdas: &[f64],
    settings: &PathSettings,
) -> Result<Vec<Vec<f64>>, CutoffError> {
    let folds = assign_folds(&train.labels(), settings.n_folds, settings.seed)?;
    let mut deviances = vec![vec![0.0; settings.n_folds]; lambdas.len()];

    for fold in 0..settings.n_folds {
        let (held_out, fitted): (Vec<usize>, Vec<usize>) =
            (0..train.len()).partition(|&i| folds[i] == fold);
        let fit_set = train.select(&fitted);
        let eval_set = train.select(&held_out);

        let standardizer = Standardizer::fit(&fit_set);
        let x_fit = standardizer.transform(&fit_set);
        let y_fit = targets(&fit_set);
        let x_eval = standardizer.transform(&eval_set);
        let y_eval = targets(&eval_set);

        let mut weights = Array1::zeros(train.arity());
        let mut bias = 0.0;
        for (k, &lambda) in lambdas.iter().enumerate() {
            descend(
                &x_fit,
                &y_fit,
                lambda,
                settings.alpha,
                &settings.descent,
                &mut weights,
                &mut bias,
            );
            let probabilities = (x_eval.dot(&weights) + bias).mapv(sigmoid);
            deviances[k][fold] = binomial_deviance(&probabilities, &y_eval);
        }
        debug!(fold, n_held_out = held_out.len(), "fold path complete");
    }

    Ok(deviances)
}

/// `-2 * mean log-likelihood` of `labels` under `probabilities`.
pub fn binomial_deviance(probabilities: &Array1<f64>, labels: &Array1<f64>) -> f64 {
    const EPS: f64 = 1e-15;
    let n = probabilities.len().max(1) as f64;
    let log_likelihood: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(&p, &y)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum();
    -2.0 * log_likelihood / n
}

fn mean_and_std_error(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, (variance / n).sqrt())
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, lowest), (i, &v)| {
            if v < lowest {
                (i, v)
            } else {
                (best, lowest)
            }
        })
        .0
}
