//! Reproducible label-stratified partitioning.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::dataset::{Dataset, Label};
use crate::error::CutoffError;

/// A train/holdout partition of a source dataset.
///
/// `train_indices` and `holdout_indices` are ascending source row indices;
/// together they cover every source row exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub holdout: Dataset,
    pub train_indices: Vec<usize>,
    pub holdout_indices: Vec<usize>,
}

/// Splits `dataset` so that roughly `fraction` of each label class lands in
/// the training set.
///
/// Each class is shuffled with a generator seeded from `seed`, the first
/// `round(fraction * class_size)` rows go to training and the remainder to
/// the holdout. The per-class count is kept within `[1, class_size - 1]`
/// so both subsets see both classes.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CutoffError::InvalidFraction`] | `fraction` not in (0, 1) |
/// | [`CutoffError::EmptyDataset`] | Zero records |
/// | [`CutoffError::InsufficientData`] | A class has fewer than 2 records |
#[instrument(skip(dataset), fields(n_records = dataset.len()))]
pub fn split(dataset: &Dataset, fraction: f64, seed: u64) -> Result<Split, CutoffError> {
    if fraction.is_nan() || fraction <= 0.0 || fraction >= 1.0 {
        return Err(CutoffError::InvalidFraction { fraction });
    }
    if dataset.is_empty() {
        return Err(CutoffError::EmptyDataset);
    }

    let mut by_class = group_by_label(&dataset.labels());
    for (label, indices) in Label::ALL.iter().zip(&by_class) {
        if indices.len() < 2 {
            return Err(CutoffError::InsufficientData {
                label: *label,
                count: indices.len(),
                required: 2,
            });
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut holdout_indices = Vec::new();

    for (label, indices) in Label::ALL.iter().zip(&mut by_class) {
        indices.shuffle(&mut rng);
        let n_train = stratum_train_size(indices.len(), fraction);
        debug!(%label, class_size = indices.len(), n_train, "partitioned stratum");

        let (train, holdout) = indices.split_at(n_train);
        train_indices.extend_from_slice(train);
        holdout_indices.extend_from_slice(holdout);
    }

    train_indices.sort_unstable();
    holdout_indices.sort_unstable();

    Ok(Split {
        train: dataset.select(&train_indices),
        holdout: dataset.select(&holdout_indices),
        train_indices,
        holdout_indices,
    })
}

/// Assigns every row a fold id in `0..n_folds`, balancing each label class
/// across folds.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`CutoffError::InvalidFoldCount`] | `n_folds` < 2 |
/// | [`CutoffError::TooFewSamplesForFolds`] | A present class has fewer rows than folds |
pub fn assign_folds(labels: &[Label], n_folds: usize, seed: u64) -> Result<Vec<usize>, CutoffError> {
    if n_folds < 2 {
        return Err(CutoffError::InvalidFoldCount { n_folds });
    }

    let mut by_class = group_by_label(labels);
    for (label, indices) in Label::ALL.iter().zip(&by_class) {
        if !indices.is_empty() && indices.len() < n_folds {
            return Err(CutoffError::TooFewSamplesForFolds {
                label: *label,
                count: indices.len(),
                n_folds,
            });
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut folds = vec![0usize; labels.len()];

    // Continue the round-robin across classes so fold sizes stay even.
    let mut next = 0;
    for indices in &mut by_class {
        indices.shuffle(&mut rng);
        for &idx in indices.iter() {
            folds[idx] = next % n_folds;
            next += 1;
        }
    }

    Ok(folds)
}

fn group_by_label(labels: &[Label]) -> [Vec<usize>; 2] {
    let mut by_class = [Vec::new(), Vec::new()];
    for (i, label) in labels.iter().enumerate() {
        by_class[usize::from(label.is_positive())].push(i);
    }
    by_class
}

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn stratum_train_size(class_size: usize, fraction: f64) -> usize {
    let target = (fraction * class_size as f64).round() as usize;
    target.clamp(1, class_size - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    /// 20 negatives followed by 10 positives, feature = row index.
    fn imbalanced() -> Dataset {
        let rows = (0..30).map(|i| vec![i as f64]).collect();
        let labels: Vec<Label> = (0..30).map(|i| Label::from_bool(i >= 20)).collect();
        Dataset::from_rows(rows, &labels).unwrap()
    }

    #[test]
    fn partition_is_disjoint_and_exhaustive() {
        let ds = imbalanced();
        let split = split(&ds, 0.7, 42).unwrap();

        assert_eq!(split.train.len() + split.holdout.len(), ds.len());

        let train: HashSet<_> = split.train_indices.iter().copied().collect();
        let holdout: HashSet<_> = split.holdout_indices.iter().copied().collect();
        assert!(train.is_disjoint(&holdout));
        assert_eq!(train.union(&holdout).count(), ds.len());
    }

    #[test]
    fn same_seed_same_partition() {
        let ds = imbalanced();
        let a = split(&ds, 0.6, 7).unwrap();
        let b = split(&ds, 0.6, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_usually_differs() {
        let ds = imbalanced();
        let a = split(&ds, 0.5, 1).unwrap();
        let b = split(&ds, 0.5, 2).unwrap();
        assert_ne!(a.train_indices, b.train_indices);
    }

    #[test]
    fn class_counts_follow_rounding() {
        let ds = imbalanced();
        let split = split(&ds, 0.7, 3).unwrap();
        // round(0.7 * 20) = 14, round(0.7 * 10) = 7
        assert_eq!(split.train.count(Label::Negative), 14);
        assert_eq!(split.train.count(Label::Positive), 7);
        assert_eq!(split.holdout.count(Label::Negative), 6);
        assert_eq!(split.holdout.count(Label::Positive), 3);
    }

    #[test]
    fn train_rows_match_source_rows() {
        let ds = imbalanced();
        let split = split(&ds, 0.5, 11).unwrap();
        for (record, &idx) in split.train.records().iter().zip(&split.train_indices) {
            assert_eq!(record, &ds.records()[idx]);
        }
        assert!(split.train_indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn tiny_classes_keep_one_row_each_side() {
        let ds = Dataset::from_rows(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
            &[Label::Negative, Label::Negative, Label::Positive, Label::Positive],
        )
        .unwrap();
        let split = split(&ds, 0.01, 0).unwrap();
        assert_eq!(split.train.count(Label::Negative), 1);
        assert_eq!(split.train.count(Label::Positive), 1);
    }

    #[test]
    fn invalid_fraction() {
        let ds = imbalanced();
        for fraction in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let err = split(&ds, fraction, 0).unwrap_err();
            assert!(matches!(err, CutoffError::InvalidFraction { .. }));
        }
    }

    #[test]
    fn insufficient_class() {
        let ds = Dataset::from_rows(
            vec![vec![0.0], vec![1.0], vec![2.0]],
            &[Label::Negative, Label::Negative, Label::Positive],
        )
        .unwrap();
        let err = split(&ds, 0.5, 0).unwrap_err();
        assert!(matches!(
            err,
            CutoffError::InsufficientData {
                label: Label::Positive,
                count: 1,
                required: 2
            }
        ));
    }

    #[test]
    fn folds_are_balanced_per_class() {
        let labels: Vec<Label> = (0..30).map(|i| Label::from_bool(i % 3 == 0)).collect();
        let folds = assign_folds(&labels, 5, 42).unwrap();
        for fold in 0..5 {
            let positives = labels
                .iter()
                .zip(&folds)
                .filter(|&(l, &f)| l.is_positive() && f == fold)
                .count();
            assert_eq!(positives, 2);
            assert_eq!(folds.iter().filter(|&&f| f == fold).count(), 6);
        }
    }

    #[test]
    fn too_few_for_folds() {
        let labels = [Label::Negative, Label::Negative, Label::Positive, Label::Negative];
        let err = assign_folds(&labels, 2, 0).unwrap_err();
        assert!(matches!(
            err,
            CutoffError::TooFewSamplesForFolds {
                label: Label::Positive,
                count: 1,
                n_folds: 2
            }
        ));
        assert!(matches!(
            assign_folds(&labels, 1, 0).unwrap_err(),
            CutoffError::InvalidFoldCount { n_folds: 1 }
        ));
    }
}
