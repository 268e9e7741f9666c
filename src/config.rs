//! Experiment and loader configuration.

use crate::error::CutoffError;
use crate::gradient_descent::GradientDescentSettings;
use crate::regularization_path::{PathSettings, SelectionRule};

/// How to read a labeled CSV table.
///
/// The defaults match the Wisconsin diagnostic breast-cancer table: an `id`
/// column, a `diagnosis` column with `M` (malignant) or `B` (benign), and
/// numeric features in every other column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub label_column: String,
    pub positive_value: String,
    pub negative_value: String,
    pub ignored_columns: Vec<String>,
    /// Cells that mark a value as missing; rows containing one are dropped.
    pub missing_markers: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            label_column: "diagnosis".to_string(),
            positive_value: "M".to_string(),
            negative_value: "B".to_string(),
            ignored_columns: vec!["id".to_string()],
            missing_markers: vec![String::new(), "NA".to_string(), "?".to_string()],
        }
    }
}

/// Everything one run needs besides the data.
///
/// Construct via [`ExperimentConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default           |
/// |------------------|-------------------|
/// | `train_fraction` | 0.7               |
/// | `seed`           | 42                |
/// | `thresholds`     | 0.1, 0.5, 0.9     |
/// | `sweep_steps`    | 101               |
/// | `path`           | [`PathSettings::default`] |
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub(crate) train_fraction: f64,
    pub(crate) seed: u64,
    pub(crate) thresholds: Vec<f64>,
    pub(crate) sweep_steps: usize,
    pub(crate) path: PathSettings,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentConfig {
    pub fn new() -> Self {
        Self {
            train_fraction: 0.7,
            seed: 42,
            thresholds: vec![0.1, 0.5, 0.9],
            sweep_steps: 101,
            path: PathSettings::default(),
        }
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Result<Self, CutoffError> {
        if fraction.is_nan() || fraction <= 0.0 || fraction >= 1.0 {
            return Err(CutoffError::InvalidFraction { fraction });
        }
        self.train_fraction = fraction;
        Ok(self)
    }

    /// Seeds both the train/holdout split and the CV fold assignment.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.path.seed = seed;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Vec<f64>) -> Result<Self, CutoffError> {
        if let Some(bad) = thresholds.iter().find(|t| t.is_nan()) {
            return Err(CutoffError::InvalidThreshold {
                reason: format!("threshold {bad} is not a number"),
            });
        }
        self.thresholds = thresholds;
        Ok(self)
    }

    pub fn with_sweep_steps(mut self, steps: usize) -> Result<Self, CutoffError> {
        if steps < 2 {
            return Err(CutoffError::InvalidThreshold {
                reason: format!("sweep needs at least 2 steps, got {steps}"),
            });
        }
        self.sweep_steps = steps;
        Ok(self)
    }

    #[must_use]
    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.path.n_folds = n_folds;
        self
    }

    #[must_use]
    pub fn with_lambdas(mut self, n_lambdas: usize, min_ratio: f64) -> Self {
        self.path.n_lambdas = n_lambdas;
        self.path.min_ratio = min_ratio;
        self
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.path.alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_selection_rule(mut self, rule: SelectionRule) -> Self {
        self.path.rule = rule;
        self
    }

    #[must_use]
    pub fn with_descent(mut self, descent: GradientDescentSettings) -> Self {
        self.path.descent = descent;
        self
    }

    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn sweep_steps(&self) -> usize {
        self.sweep_steps
    }

    /// Path settings; validated when the trainer is built from them.
    pub fn path(&self) -> &PathSettings {
        &self.path
    }
}
