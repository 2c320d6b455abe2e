//! Per-fold evaluation metrics and their aggregation across folds.
//!
//! Classification metrics always carry accuracy. When every predicted and
//! actual label is a binary class id (`0` or `1`) they also carry precision,
//! recall, F1 and the confusion counts. Regression metrics are MSE, RMSE, MAE
//! and MAPE (as a fraction, not a percentage).
//!
//! Aggregation reports the mean and the population standard deviation of each
//! metric over the folds that have it. Confusion counts are summed across
//! folds and the overall scores are recomputed from the summed matrix.

use crate::errors::{validate_same_length, ValidationResult};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFUSION MATRIX
// ============================================================================

/// Binary confusion counts with class `1` as the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfusionMatrix {
    /// Predicted 1, actual 1
    pub true_positives: usize,
    /// Predicted 0, actual 0
    pub true_negatives: usize,
    /// Predicted 1, actual 0
    pub false_positives: usize,
    /// Predicted 0, actual 1
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Number of counted predictions.
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// `tp / (tp + fp)`, `0` without positive predictions.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `tp / (tp + fn)`, `0` without positive actuals.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall, `0` when both are `0`.
    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    /// `(tp + tn) / total`, `0` for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Scores recomputed from these counts.
    pub fn scores(&self) -> OverallScores {
        OverallScores {
            precision: self.precision(),
            recall: self.recall(),
            f1_score: self.f1_score(),
            accuracy: self.accuracy(),
        }
    }
}

impl Add for ConfusionMatrix {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            true_positives: self.true_positives + other.true_positives,
            true_negatives: self.true_negatives + other.true_negatives,
            false_positives: self.false_positives + other.false_positives,
            false_negatives: self.false_negatives + other.false_negatives,
        }
    }
}

impl AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for ConfusionMatrix {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Precision, recall, F1 and accuracy derived from a (summed) confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OverallScores {
    /// Precision of the positive class
    pub precision: f64,
    /// Recall of the positive class
    pub recall: f64,
    /// F1 score of the positive class
    pub f1_score: f64,
    /// Fraction of correct predictions
    pub accuracy: f64,
}

// ============================================================================
// METRIC TYPES
// ============================================================================

/// Classification metrics of one fold, or their mean/std across folds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassificationMetrics {
    /// Fraction of predictions equal to the actual class
    pub accuracy: f64,
    /// Precision (binary labels only)
    pub precision: Option<f64>,
    /// Recall (binary labels only)
    pub recall: Option<f64>,
    /// F1 score (binary labels only)
    pub f1_score: Option<f64>,
    /// Confusion counts (binary labels only; absent on aggregates)
    pub confusion_matrix: Option<ConfusionMatrix>,
}

impl ClassificationMetrics {
    /// Whether the binary metrics are present.
    pub fn is_binary(&self) -> bool {
        self.precision.is_some()
    }
}

impl fmt::Display for ClassificationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "accuracy={:.4}", self.accuracy)?;
        if let (Some(p), Some(r), Some(f1)) = (self.precision, self.recall, self.f1_score) {
            write!(f, " precision={:.4} recall={:.4} f1={:.4}", p, r, f1)?;
        }
        Ok(())
    }
}

/// Regression error metrics of one fold, or their mean/std across folds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionMetrics {
    /// Mean squared error
    pub mse: f64,
    /// Square root of the MSE
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Mean absolute percentage error as a fraction, over non-zero actuals
    pub mape: f64,
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mse={:.6} rmse={:.6} mae={:.6} mape={:.4}",
            self.mse, self.rmse, self.mae, self.mape
        )
    }
}

/// Metrics of one fold, tagged by task.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FoldMetrics {
    /// Classification task
    Classification(ClassificationMetrics),
    /// Regression task
    Regression(RegressionMetrics),
}

impl FoldMetrics {
    /// Classification metrics, if this fold was a classification task.
    pub fn as_classification(&self) -> Option<&ClassificationMetrics> {
        match self {
            FoldMetrics::Classification(m) => Some(m),
            FoldMetrics::Regression(_) => None,
        }
    }

    /// Regression metrics, if this fold was a regression task.
    pub fn as_regression(&self) -> Option<&RegressionMetrics> {
        match self {
            FoldMetrics::Regression(m) => Some(m),
            FoldMetrics::Classification(_) => None,
        }
    }
}

impl fmt::Display for FoldMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldMetrics::Classification(m) => fmt::Display::fmt(m, f),
            FoldMetrics::Regression(m) => fmt::Display::fmt(m, f),
        }
    }
}

// ============================================================================
// CALCULATORS
// ============================================================================

/// Integer class id of a label, `None` for non-finite values.
fn class_id(value: f64) -> Option<i64> {
    if value.is_finite() {
        Some(value.round() as i64)
    } else {
        None
    }
}

/// Accuracy, plus binary metrics when all labels are `0`/`1` class ids.
///
/// Labels are compared as rounded class ids; a non-finite label never matches.
/// Empty input yields accuracy `0`.
///
/// # Errors
/// `LengthMismatch` when the two slices differ in length.
///
/// # Example
/// ```rust
/// use robust_validation::metrics::calculate_classification_metrics;
///
/// let m = calculate_classification_metrics(&[1.0, 0.0, 1.0, 1.0], &[1.0, 0.0, 0.0, 1.0]).unwrap();
/// assert_eq!(m.accuracy, 0.75);
/// assert_eq!(m.confusion_matrix.unwrap().false_positives, 1);
/// ```
pub fn calculate_classification_metrics(
    predictions: &[f64],
    actuals: &[f64],
) -> ValidationResult<ClassificationMetrics> {
    validate_same_length(predictions.len(), actuals.len(), "predictions vs actuals")?;

    let predicted: Vec<Option<i64>> = predictions.iter().map(|&p| class_id(p)).collect();
    let actual: Vec<Option<i64>> = actuals.iter().map(|&a| class_id(a)).collect();

    let correct = predicted
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| p.is_some() && p == a)
        .count();
    let accuracy = ratio(correct, actuals.len());

    let is_binary = predicted
        .iter()
        .chain(actual.iter())
        .all(|label| matches!(label, Some(0) | Some(1)));

    if !is_binary {
        return Ok(ClassificationMetrics {
            accuracy,
            ..ClassificationMetrics::default()
        });
    }

    let mut matrix = ConfusionMatrix::default();
    for (p, a) in predicted.iter().zip(actual.iter()) {
        match (p, a) {
            (Some(1), Some(1)) => matrix.true_positives += 1,
            (Some(0), Some(0)) => matrix.true_negatives += 1,
            (Some(1), Some(0)) => matrix.false_positives += 1,
            (Some(0), Some(1)) => matrix.false_negatives += 1,
            _ => {}
        }
    }

    Ok(ClassificationMetrics {
        accuracy,
        precision: Some(matrix.precision()),
        recall: Some(matrix.recall()),
        f1_score: Some(matrix.f1_score()),
        confusion_matrix: Some(matrix),
    })
}

/// MSE, RMSE, MAE and MAPE of `predictions` against `actuals`.
///
/// MAPE averages `|error| / |actual|` over the rows with a non-zero actual and
/// is `0` when there are none. Empty input yields all zeros.
///
/// # Errors
/// `LengthMismatch` when the two slices differ in length.
///
/// # Example
/// ```rust
/// use robust_validation::metrics::calculate_regression_metrics;
///
/// let m = calculate_regression_metrics(&[2.0, 4.0], &[1.0, 5.0]).unwrap();
/// assert_eq!(m.mse, 1.0);
/// assert_eq!(m.mae, 1.0);
/// assert!((m.mape - 0.6).abs() < 1e-12);
/// ```
pub fn calculate_regression_metrics(
    predictions: &[f64],
    actuals: &[f64],
) -> ValidationResult<RegressionMetrics> {
    validate_same_length(predictions.len(), actuals.len(), "predictions vs actuals")?;

    let n = actuals.len();
    if n == 0 {
        return Ok(RegressionMetrics::default());
    }

    let mut squared_error = 0.0;
    let mut absolute_error = 0.0;
    let mut percentage_error = 0.0;
    let mut percentage_count = 0usize;

    for (&p, &a) in predictions.iter().zip(actuals.iter()) {
        let error = p - a;
        squared_error += error * error;
        absolute_error += error.abs();
        if a.abs() > 0.0 {
            percentage_error += error.abs() / a.abs();
            percentage_count += 1;
        }
    }

    let mse = squared_error / n as f64;
    Ok(RegressionMetrics {
        mse,
        rmse: mse.sqrt(),
        mae: absolute_error / n as f64,
        mape: if percentage_count == 0 {
            0.0
        } else {
            percentage_error / percentage_count as f64
        },
    })
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Mean and standard deviation of classification metrics across folds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassificationSummary {
    /// Per-metric mean over the folds that report it
    pub average: ClassificationMetrics,
    /// Per-metric population standard deviation over the same folds
    pub std_deviation: ClassificationMetrics,
    /// Element-wise sum of the fold confusion matrices, if any fold had one
    pub overall_confusion_matrix: Option<ConfusionMatrix>,
    /// Scores recomputed from the summed confusion matrix
    pub overall_scores: Option<OverallScores>,
}

/// Mean and standard deviation of regression metrics across folds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionSummary {
    /// Per-metric mean
    pub average: RegressionMetrics,
    /// Per-metric population standard deviation
    pub std_deviation: RegressionMetrics,
}

/// Mean and population standard deviation; `None` for no values.
fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

fn optional_mean_and_std<F>(folds: &[ClassificationMetrics], metric: F) -> (Option<f64>, Option<f64>)
where
    F: Fn(&ClassificationMetrics) -> Option<f64>,
{
    let values: Vec<f64> = folds.iter().filter_map(metric).collect();
    match mean_and_std(&values) {
        Some((mean, std)) => (Some(mean), Some(std)),
        None => (None, None),
    }
}

/// Aggregates classification folds. Returns `None` for an empty slice.
pub fn summarize_classification(folds: &[ClassificationMetrics]) -> Option<ClassificationSummary> {
    let accuracies: Vec<f64> = folds.iter().map(|m| m.accuracy).collect();
    let (accuracy_mean, accuracy_std) = mean_and_std(&accuracies)?;

    let (precision_mean, precision_std) = optional_mean_and_std(folds, |m| m.precision);
    let (recall_mean, recall_std) = optional_mean_and_std(folds, |m| m.recall);
    let (f1_mean, f1_std) = optional_mean_and_std(folds, |m| m.f1_score);

    let matrices: Vec<ConfusionMatrix> = folds.iter().filter_map(|m| m.confusion_matrix).collect();
    let overall_confusion_matrix = if matrices.is_empty() {
        None
    } else {
        Some(matrices.into_iter().sum::<ConfusionMatrix>())
    };

    Some(ClassificationSummary {
        average: ClassificationMetrics {
            accuracy: accuracy_mean,
            precision: precision_mean,
            recall: recall_mean,
            f1_score: f1_mean,
            confusion_matrix: None,
        },
        std_deviation: ClassificationMetrics {
            accuracy: accuracy_std,
            precision: precision_std,
            recall: recall_std,
            f1_score: f1_std,
            confusion_matrix: None,
        },
        overall_scores: overall_confusion_matrix.map(|m| m.scores()),
        overall_confusion_matrix,
    })
}

/// Aggregates regression folds. Returns `None` for an empty slice.
pub fn summarize_regression(folds: &[RegressionMetrics]) -> Option<RegressionSummary> {
    let column = |f: fn(&RegressionMetrics) -> f64| -> Option<(f64, f64)> {
        mean_and_std(&folds.iter().map(f).collect::<Vec<_>>())
    };

    let (mse_mean, mse_std) = column(|m| m.mse)?;
    let (rmse_mean, rmse_std) = column(|m| m.rmse)?;
    let (mae_mean, mae_std) = column(|m| m.mae)?;
    let (mape_mean, mape_std) = column(|m| m.mape)?;

    Some(RegressionSummary {
        average: RegressionMetrics {
            mse: mse_mean,
            rmse: rmse_mean,
            mae: mae_mean,
            mape: mape_mean,
        },
        std_deviation: RegressionMetrics {
            mse: mse_std,
            rmse: rmse_std,
            mae: mae_std,
            mape: mape_std,
        },
    })
}
