//! Cross-validation fold generation and fit/evaluate orchestration.
//!
//! This module produces train/validation index partitions and drives a
//! caller-supplied model through them:
//!
//! - **K-fold**: indices are shuffled once and cut into `k` validation chunks;
//!   training is the complement of each chunk.
//! - **Stratified k-fold**: each class is shuffled separately and dealt
//!   round-robin over the folds so every fold keeps the class proportions.
//! - **Rolling / expanding windows**: order-preserving folds for time series,
//!   with an optional gap between training and validation and a fixed horizon.
//!
//! Every fold is evaluated with a model obtained from [`ModelFactory::create`]
//! immediately before fitting. A fitted model is never carried into another
//! fold; the model and both dataset views of a fold are dropped before the next
//! fold starts.

use crate::dataset::{Dataset, DatasetView};
use crate::errors::{validate_positive, ValidationError, ValidationResult};
use crate::metrics::{
    calculate_classification_metrics, calculate_regression_metrics, summarize_classification,
    summarize_regression, ClassificationMetrics, ClassificationSummary, ConfusionMatrix,
    FoldMetrics, OverallScores, RegressionSummary,
};
use crate::secure_rng::SecureRng;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// FOLDS AND CONFIGURATION
// ============================================================================

/// One train/validation partition of a dataset's row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fold {
    /// Rows the model is fitted on
    pub train_indices: Vec<usize>,
    /// Rows the fitted model is scored on
    pub validation_indices: Vec<usize>,
}

impl Fold {
    /// Verifies that every index is below `n` and that no row is both a
    /// training and a validation row.
    pub fn check(&self, n: usize) -> ValidationResult<()> {
        let mut in_train = vec![false; n];
        for &i in &self.train_indices {
            if i >= n {
                return Err(ValidationError::IndexOutOfRange { index: i, len: n });
            }
            in_train[i] = true;
        }
        for &i in &self.validation_indices {
            if i >= n {
                return Err(ValidationError::IndexOutOfRange { index: i, len: n });
            }
            if in_train[i] {
                return Err(ValidationError::InvalidParameter {
                    parameter: "fold".to_string(),
                    value: i as f64,
                    constraint: "train and validation rows must be disjoint".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Window strategy for time-series folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WindowStrategy {
    /// Fixed-size training window sliding forward one step per fold
    Rolling,
    /// Training window anchored at row 0 and growing one step per fold
    Expanding,
}

/// Which metrics a validation run computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaskType {
    /// Accuracy, plus precision/recall/F1 for binary labels
    #[default]
    Classification,
    /// MSE, RMSE, MAE and MAPE
    Regression,
}

/// Configuration for shuffled k-fold validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CrossValidationConfig {
    /// Number of folds `k` (at least 2)
    pub folds: usize,
    /// Keep class proportions in every validation set
    pub stratified: bool,
    /// Shuffle seed; overrides the validator's seed when set
    pub seed: Option<u64>,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            stratified: false,
            seed: None,
        }
    }
}

/// Configuration for order-preserving time-series folds.
///
/// Fold `i` trains on
///
/// ```text
/// rolling:   [i, i + window_size)
/// expanding: [0, window_size + i)
/// ```
///
/// skips `gap` rows and validates on the next `horizon` rows. Generation stops
/// when the validation window would run past the end of the data or after
/// `max_folds` folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeSeriesFoldConfig {
    /// Rolling or expanding training window
    pub strategy: WindowStrategy,
    /// Training window length (initial length when expanding); must be > 0
    pub window_size: usize,
    /// Validation window length; must be > 0
    pub horizon: usize,
    /// Rows skipped between the training and validation windows
    pub gap: usize,
    /// Upper bound on the number of folds; must be > 0 when set
    pub max_folds: Option<usize>,
}

impl TimeSeriesFoldConfig {
    /// Rolling windows of `window_size` rows, horizon 1, no gap.
    pub fn rolling(window_size: usize) -> Self {
        Self {
            strategy: WindowStrategy::Rolling,
            window_size,
            horizon: 1,
            gap: 0,
            max_folds: None,
        }
    }

    /// Expanding windows starting at `window_size` rows, horizon 1, no gap.
    pub fn expanding(window_size: usize) -> Self {
        Self {
            strategy: WindowStrategy::Expanding,
            ..Self::rolling(window_size)
        }
    }

    /// Sets the validation window length.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Sets the number of rows skipped between training and validation.
    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    /// Caps the number of generated folds.
    pub fn with_max_folds(mut self, max_folds: usize) -> Self {
        self.max_folds = Some(max_folds);
        self
    }

    /// Rejects zero-length windows and a zero fold cap.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive(self.window_size, "window_size")?;
        validate_positive(self.horizon, "horizon")?;
        if let Some(max_folds) = self.max_folds {
            validate_positive(max_folds, "max_folds")?;
        }
        Ok(())
    }
}

/// Time-series folds plus the task that decides which metrics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeSeriesValidationConfig {
    /// Fold layout
    pub folds: TimeSeriesFoldConfig,
    /// Classification or regression metrics
    pub task: TaskType,
}

impl TimeSeriesValidationConfig {
    /// Pairs a fold layout with a task type.
    pub fn new(folds: TimeSeriesFoldConfig, task: TaskType) -> Self {
        Self { folds, task }
    }
}

// ============================================================================
// MODEL CAPABILITY
// ============================================================================

/// A predictor that can be fitted once and then queried.
///
/// Predictions for classification are class ids (`0.0`, `1.0`, ...); for
/// regression they are the predicted values. `predict` must return exactly one
/// value per validation row. Resources are released on `Drop`.
pub trait Model {
    /// Failure reported by `fit` or `predict`.
    type Error: fmt::Display;

    /// Fits the model on the training rows.
    fn fit(&mut self, train: &dyn Dataset) -> Result<(), Self::Error>;

    /// Predicts one value per row of `validation`.
    fn predict(&self, validation: &dyn Dataset) -> Result<Vec<f64>, Self::Error>;
}

/// Source of fresh, untrained models.
///
/// Every call to [`create`](ModelFactory::create) must return a new instance
/// that shares no mutable state (weights, optimizer state, caches) with any
/// previously returned instance. Closures `Fn() -> M` implement this trait.
pub trait ModelFactory {
    /// Model type produced by this factory.
    type Model: Model;

    /// Builds a new untrained model.
    fn create(&self) -> Self::Model;
}

impl<F, M> ModelFactory for F
where
    F: Fn() -> M,
    M: Model,
{
    type Model = M;

    fn create(&self) -> M {
        self()
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Outcome of k-fold classification validation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidationResults {
    /// Metrics of every fold, in fold order
    pub fold_metrics: Vec<ClassificationMetrics>,
    /// Per-metric mean across folds
    pub average: ClassificationMetrics,
    /// Per-metric population standard deviation across folds
    pub std_deviation: ClassificationMetrics,
    /// Sum of the fold confusion matrices (binary labels only)
    pub overall_confusion_matrix: Option<ConfusionMatrix>,
    /// Scores recomputed from the summed confusion matrix
    pub overall_scores: Option<OverallScores>,
}

impl From<(Vec<ClassificationMetrics>, ClassificationSummary)> for ValidationResults {
    fn from((fold_metrics, summary): (Vec<ClassificationMetrics>, ClassificationSummary)) -> Self {
        Self {
            fold_metrics,
            average: summary.average,
            std_deviation: summary.std_deviation,
            overall_confusion_matrix: summary.overall_confusion_matrix,
            overall_scores: summary.overall_scores,
        }
    }
}

/// Outcome of time-series validation.
///
/// Both summaries are `None` when no fold fits into the data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeSeriesValidationResults {
    /// Metrics of every fold, in temporal order
    pub fold_metrics: Vec<FoldMetrics>,
    /// Aggregate of the classification folds
    pub classification: Option<ClassificationSummary>,
    /// Aggregate of the regression folds
    pub regression: Option<RegressionSummary>,
}

// ============================================================================
// CROSS VALIDATOR
// ============================================================================

/// Generates folds and runs fit/predict/score cycles over them.
///
/// # Example
/// ```rust
/// use robust_validation::cross_validation::CrossValidator;
///
/// let folds = CrossValidator::new().with_seed(7).generate_folds(10, 5).unwrap();
/// assert_eq!(folds.len(), 5);
/// assert!(folds.iter().all(|f| f.validation_indices.len() == 2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrossValidator {
    seed: Option<u64>,
    cancel: Option<Arc<AtomicBool>>,
}

impl CrossValidator {
    /// Validator shuffling from OS entropy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every shuffle reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Aborts a validation run at the next fold boundary once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn rng(&self, seed: Option<u64>) -> SecureRng {
        SecureRng::from_optional_seed(seed.or(self.seed))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn check_cancelled(&self, completed_folds: usize) -> ValidationResult<()> {
        if self.is_cancelled() {
            info!(
                "Validation cancelled after {} completed folds",
                completed_folds
            );
            return Err(ValidationError::Cancelled { completed_folds });
        }
        Ok(())
    }

    /// Shuffled k-fold partition of `0..n`.
    ///
    /// The validation sets partition `0..n`; when `k` does not divide `n` the
    /// first `n mod k` folds get one extra row. Indices within each fold are
    /// sorted ascending.
    ///
    /// # Errors
    /// `InvalidParameter` when `k < 2`, `InsufficientData` when `n < k`.
    pub fn generate_folds(&self, n: usize, k: usize) -> ValidationResult<Vec<Fold>> {
        self.shuffled_folds(n, k, None)
    }

    fn shuffled_folds(&self, n: usize, k: usize, seed: Option<u64>) -> ValidationResult<Vec<Fold>> {
        check_fold_count(n, k)?;

        let shuffled = self.rng(seed).shuffled_indices(n);
        let base = n / k;
        let remainder = n % k;

        let mut assignment = vec![0usize; n];
        let mut start = 0;
        for fold in 0..k {
            let size = if fold < remainder { base + 1 } else { base };
            for &row in &shuffled[start..start + size] {
                assignment[row] = fold;
            }
            start += size;
        }

        let folds = folds_from_assignment(&assignment, k);
        debug!("Generated {} shuffled folds over {} rows", folds.len(), n);
        Ok(folds)
    }

    /// Stratified k-fold partition of the rows of `labels`.
    ///
    /// Rows are bucketed by class id, each bucket is shuffled, and rows are
    /// dealt to folds round-robin. The deal continues across classes so fold
    /// sizes differ by at most one.
    ///
    /// # Errors
    /// `InvalidParameter` when `k < 2`, `InsufficientData` when there are fewer
    /// rows than folds.
    pub fn generate_stratified_folds(&self, labels: &[f64], k: usize) -> ValidationResult<Vec<Fold>> {
        self.stratified_folds(labels, k, None)
    }

    fn stratified_folds(
        &self,
        labels: &[f64],
        k: usize,
        seed: Option<u64>,
    ) -> ValidationResult<Vec<Fold>> {
        let n = labels.len();
        check_fold_count(n, k)?;

        let mut classes: BTreeMap<Option<i64>, Vec<usize>> = BTreeMap::new();
        for (row, &label) in labels.iter().enumerate() {
            let class = label.is_finite().then(|| label.round() as i64);
            classes.entry(class).or_default().push(row);
        }

        let mut rng = self.rng(seed);
        let mut assignment = vec![0usize; n];
        let mut next_fold = 0;
        for rows in classes.values_mut() {
            rng.shuffle(rows);
            for &row in rows.iter() {
                assignment[row] = next_fold;
                next_fold = (next_fold + 1) % k;
            }
        }

        let folds = folds_from_assignment(&assignment, k);
        debug!(
            "Generated {} stratified folds over {} rows in {} classes",
            folds.len(),
            n,
            classes.len()
        );
        Ok(folds)
    }

    /// Order-preserving folds for `n` time-ordered rows.
    ///
    /// Never shuffles. An empty result means not even one training window plus
    /// gap plus horizon fits into `n` rows.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero window, zero horizon or zero fold cap.
    ///
    /// # Example
    /// ```rust
    /// use robust_validation::cross_validation::{CrossValidator, TimeSeriesFoldConfig};
    ///
    /// let folds = CrossValidator::new()
    ///     .generate_time_series_folds(10, &TimeSeriesFoldConfig::rolling(3))
    ///     .unwrap();
    /// assert_eq!(folds.len(), 7);
    /// assert_eq!(folds[0].train_indices, vec![0, 1, 2]);
    /// assert_eq!(folds[6].validation_indices, vec![9]);
    /// ```
    pub fn generate_time_series_folds(
        &self,
        n: usize,
        config: &TimeSeriesFoldConfig,
    ) -> ValidationResult<Vec<Fold>> {
        config.validate()?;

        let limit = config.max_folds.unwrap_or(usize::MAX);
        let mut folds = Vec::new();

        for step in 0usize.. {
            if folds.len() >= limit {
                break;
            }

            let (train_start, train_end) = match config.strategy {
                WindowStrategy::Rolling => (step, step.saturating_add(config.window_size)),
                WindowStrategy::Expanding => (0, config.window_size.saturating_add(step)),
            };
            let validation_start = train_end.saturating_add(config.gap);
            let validation_end = validation_start.saturating_add(config.horizon);
            if validation_end > n {
                break;
            }

            folds.push(Fold {
                train_indices: (train_start..train_end).collect(),
                validation_indices: (validation_start..validation_end).collect(),
            });
        }

        if folds.is_empty() {
            warn!(
                "No time-series fold fits into {} rows (window={}, gap={}, horizon={})",
                n, config.window_size, config.gap, config.horizon
            );
        } else {
            debug!(
                "Generated {} {:?} time-series folds over {} rows",
                folds.len(),
                config.strategy,
                n
            );
        }

        Ok(folds)
    }

    fn kfold_partitions<D: Dataset + ?Sized>(
        &self,
        data: &D,
        config: &CrossValidationConfig,
    ) -> ValidationResult<Vec<Fold>> {
        if config.stratified {
            let labels: Vec<f64> = (0..data.len()).map(|i| data.label(i)).collect();
            self.stratified_folds(&labels, config.folds, config.seed)
        } else {
            self.shuffled_folds(data.len(), config.folds, config.seed)
        }
    }

    /// K-fold classification validation.
    ///
    /// For each fold a fresh model is created, fitted on the training rows and
    /// scored on the validation rows. The run checks for cancellation before
    /// each fold.
    ///
    /// # Errors
    /// Fold-generation errors, `ModelError` when the model fails,
    /// `PredictionCountMismatch` for a wrong number of predictions, and
    /// `Cancelled` when the cancellation flag is set.
    pub fn validate_model<F, D>(
        &self,
        factory: &F,
        data: &D,
        config: &CrossValidationConfig,
    ) -> ValidationResult<ValidationResults>
    where
        F: ModelFactory,
        D: Dataset + ?Sized,
    {
        let folds = self.kfold_partitions(data, config)?;

        let mut fold_metrics = Vec::with_capacity(folds.len());
        for (index, fold) in folds.iter().enumerate() {
            self.check_cancelled(index)?;
            fold_metrics.push(evaluate_classification_fold(factory, data, fold, index)?);
        }

        let summary = summarize_classification(&fold_metrics).ok_or(
            ValidationError::InsufficientData {
                required: 1,
                actual: 0,
            },
        )?;
        Ok(ValidationResults::from((fold_metrics, summary)))
    }

    /// K-fold classification validation with folds evaluated concurrently.
    ///
    /// Each fold creates, fits and drops its own model on a rayon worker; no
    /// model state crosses folds or threads. Fold order in the result matches
    /// [`validate_model`](Self::validate_model). Cancellation is checked before
    /// each fold starts.
    #[cfg(feature = "parallel")]
    pub fn validate_model_parallel<F, D>(
        &self,
        factory: &F,
        data: &D,
        config: &CrossValidationConfig,
    ) -> ValidationResult<ValidationResults>
    where
        F: ModelFactory + Sync,
        D: Dataset + Sync + ?Sized,
    {
        use rayon::prelude::*;
        use std::sync::atomic::AtomicUsize;

        let folds = self.kfold_partitions(data, config)?;
        let completed = AtomicUsize::new(0);

        let fold_metrics = folds
            .par_iter()
            .enumerate()
            .map(|(index, fold)| {
                self.check_cancelled(completed.load(Ordering::SeqCst))?;
                let metrics = evaluate_classification_fold(factory, data, fold, index)?;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(metrics)
            })
            .collect::<ValidationResult<Vec<_>>>()?;

        let summary = summarize_classification(&fold_metrics).ok_or(
            ValidationError::InsufficientData {
                required: 1,
                actual: 0,
            },
        )?;
        Ok(ValidationResults::from((fold_metrics, summary)))
    }

    /// Time-series validation over rolling or expanding folds.
    ///
    /// Computes classification or regression metrics according to
    /// `config.task`. When no fold fits, the result has no folds and no
    /// summaries.
    ///
    /// # Errors
    /// Same as [`validate_model`](Self::validate_model), plus invalid window
    /// parameters.
    pub fn validate_time_series_model<F, D>(
        &self,
        factory: &F,
        data: &D,
        config: &TimeSeriesValidationConfig,
    ) -> ValidationResult<TimeSeriesValidationResults>
    where
        F: ModelFactory,
        D: Dataset + ?Sized,
    {
        let folds = self.generate_time_series_folds(data.len(), &config.folds)?;

        let mut fold_metrics = Vec::with_capacity(folds.len());
        for (index, fold) in folds.iter().enumerate() {
            self.check_cancelled(index)?;
            let metrics = match config.task {
                TaskType::Classification => FoldMetrics::Classification(
                    evaluate_classification_fold(factory, data, fold, index)?,
                ),
                TaskType::Regression => {
                    let outcome = fit_and_predict(factory, data, fold, index)?;
                    let metrics =
                        calculate_regression_metrics(&outcome.predictions, &outcome.actuals)?;
                    outcome.log(index, &metrics);
                    FoldMetrics::Regression(metrics)
                }
            };
            fold_metrics.push(metrics);
        }

        let classification: Vec<ClassificationMetrics> = fold_metrics
            .iter()
            .filter_map(|m| m.as_classification().cloned())
            .collect();
        let regression: Vec<_> = fold_metrics
            .iter()
            .filter_map(|m| m.as_regression().copied())
            .collect();

        Ok(TimeSeriesValidationResults {
            classification: summarize_classification(&classification),
            regression: summarize_regression(&regression),
            fold_metrics,
        })
    }
}

fn check_fold_count(n: usize, k: usize) -> ValidationResult<()> {
    if k < 2 {
        return Err(ValidationError::InvalidParameter {
            parameter: "folds".to_string(),
            value: k as f64,
            constraint: ">= 2".to_string(),
        });
    }
    if n < k {
        return Err(ValidationError::InsufficientData {
            required: k,
            actual: n,
        });
    }
    Ok(())
}

/// Builds folds from a row-to-fold assignment; indices come out sorted.
fn folds_from_assignment(assignment: &[usize], k: usize) -> Vec<Fold> {
    (0..k)
        .map(|fold| {
            let (validation_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..assignment.len()).partition(|&row| assignment[row] == fold);
            Fold {
                train_indices,
                validation_indices,
            }
        })
        .collect()
}

/// Predictions of one fold's model next to the validation labels.
struct FoldOutcome {
    train_rows: usize,
    predictions: Vec<f64>,
    actuals: Vec<f64>,
}

impl FoldOutcome {
    fn log<M: fmt::Display>(&self, index: usize, metrics: &M) {
        debug!(
            "Fold {}: train={} validation={} {}",
            index,
            self.train_rows,
            self.actuals.len(),
            metrics
        );
    }
}

/// Fits a fresh model on the training rows of `fold` and predicts its
/// validation rows.
///
/// The model and both views are dropped when this returns, before the caller
/// moves on to the next fold.
fn fit_and_predict<F, D>(
    factory: &F,
    data: &D,
    fold: &Fold,
    index: usize,
) -> ValidationResult<FoldOutcome>
where
    F: ModelFactory,
    D: Dataset + ?Sized,
{
    let train = DatasetView::new(data, fold.train_indices.clone())?;
    let validation = DatasetView::new(data, fold.validation_indices.clone())?;

    if validation.is_empty() {
        warn!("Fold {} has an empty validation set", index);
    }

    let mut model = factory.create();
    model.fit(&train).map_err(|e| ValidationError::ModelError {
        fold: index,
        reason: e.to_string(),
    })?;

    let predictions = model
        .predict(&validation)
        .map_err(|e| ValidationError::ModelError {
            fold: index,
            reason: e.to_string(),
        })?;

    if predictions.len() != validation.len() {
        return Err(ValidationError::PredictionCountMismatch {
            fold: index,
            expected: validation.len(),
            actual: predictions.len(),
        });
    }

    Ok(FoldOutcome {
        train_rows: train.len(),
        predictions,
        actuals: validation.labels(),
    })
}

fn evaluate_classification_fold<F, D>(
    factory: &F,
    data: &D,
    fold: &Fold,
    index: usize,
) -> ValidationResult<ClassificationMetrics>
where
    F: ModelFactory,
    D: Dataset + ?Sized,
{
    let outcome = fit_and_predict(factory, data, fold, index)?;
    let metrics = calculate_classification_metrics(&outcome.predictions, &outcome.actuals)?;
    outcome.log(index, &metrics);
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TrainingData;
    use std::cell::Cell;

    /// Predicts the most frequent training label; refuses to be fitted twice.
    #[derive(Default)]
    struct MajorityModel {
        majority: Option<f64>,
    }

    impl Model for MajorityModel {
        type Error = String;

        fn fit(&mut self, train: &dyn Dataset) -> Result<(), String> {
            if self.majority.is_some() {
                return Err("model reused across folds".to_string());
            }
            let ones = (0..train.len()).filter(|&i| train.label(i) == 1.0).count();
            self.majority = Some(if 2 * ones > train.len() { 1.0 } else { 0.0 });
            Ok(())
        }

        fn predict(&self, validation: &dyn Dataset) -> Result<Vec<f64>, String> {
            let label = self.majority.ok_or("not fitted")?;
            Ok(vec![label; validation.len()])
        }
    }

    fn binary_data(n: usize) -> TrainingData {
        let features = (0..n).map(|i| vec![i as f64]).collect();
        let labels = (0..n).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect();
        TrainingData::new(features, labels).unwrap()
    }

    #[test]
    fn test_kfold_partitions_rows() {
        let folds = CrossValidator::new().generate_folds(100, 5).unwrap();
        assert_eq!(folds.len(), 5);

        let mut all: Vec<usize> = folds
            .iter()
            .flat_map(|f| f.validation_indices.iter().copied())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.validation_indices.len(), 20);
            assert_eq!(fold.train_indices.len() + fold.validation_indices.len(), 100);
            fold.check(100).unwrap();
        }
    }

    #[test]
    fn test_kfold_remainder_spread() {
        let folds = CrossValidator::new().with_seed(3).generate_folds(11, 3).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.validation_indices.len()).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
    }

    #[test]
    fn test_kfold_seed_reproducible() {
        let a = CrossValidator::new().with_seed(11).generate_folds(30, 3).unwrap();
        let b = CrossValidator::new().with_seed(11).generate_folds(30, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kfold_invalid_parameters() {
        let cv = CrossValidator::new();
        assert!(matches!(
            cv.generate_folds(10, 1),
            Err(ValidationError::InvalidParameter { .. })
        ));
        assert!(matches!(
            cv.generate_folds(3, 5),
            Err(ValidationError::InsufficientData {
                required: 5,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_stratified_keeps_proportions() {
        let labels: Vec<f64> = (0..30).map(|i| if i < 10 { 1.0 } else { 0.0 }).collect();
        let folds = CrossValidator::new()
            .with_seed(5)
            .generate_stratified_folds(&labels, 5)
            .unwrap();

        for fold in &folds {
            let positives = fold
                .validation_indices
                .iter()
                .filter(|&&i| labels[i] == 1.0)
                .count();
            assert_eq!(positives, 2);
            assert_eq!(fold.validation_indices.len(), 6);
            fold.check(30).unwrap();
        }
    }

    #[test]
    fn test_stratified_balances_fold_sizes() {
        let labels = vec![0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
        let folds = CrossValidator::new()
            .generate_stratified_folds(&labels, 3)
            .unwrap();
        let mut sizes: Vec<usize> = folds.iter().map(|f| f.validation_indices.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 2, 3]);
    }

    #[test]
    fn test_rolling_folds() {
        let folds = CrossValidator::new()
            .generate_time_series_folds(10, &TimeSeriesFoldConfig::rolling(3))
            .unwrap();
        assert_eq!(folds.len(), 7);
        for (i, fold) in folds.iter().enumerate() {
            assert_eq!(fold.train_indices, vec![i, i + 1, i + 2]);
            assert_eq!(fold.validation_indices, vec![i + 3]);
        }
    }

    #[test]
    fn test_expanding_folds_with_gap_and_horizon() {
        let config = TimeSeriesFoldConfig::expanding(4).with_gap(1).with_horizon(2);
        let folds = CrossValidator::new()
            .generate_time_series_folds(10, &config)
            .unwrap();

        // train_len + 1 + 2 <= 10  =>  train_len in 4..=7
        assert_eq!(folds.len(), 4);
        assert_eq!(folds[0].train_indices, vec![0, 1, 2, 3]);
        assert_eq!(folds[0].validation_indices, vec![5, 6]);
        assert_eq!(folds[3].train_indices, (0..7).collect::<Vec<_>>());
        assert_eq!(folds[3].validation_indices, vec![8, 9]);
    }

    #[test]
    fn test_time_series_max_folds() {
        let config = TimeSeriesFoldConfig::rolling(2).with_max_folds(3);
        let folds = CrossValidator::new()
            .generate_time_series_folds(50, &config)
            .unwrap();
        assert_eq!(folds.len(), 3);
    }

    #[test]
    fn test_time_series_invalid_config() {
        let cv = CrossValidator::new();
        assert!(cv
            .generate_time_series_folds(10, &TimeSeriesFoldConfig::rolling(0))
            .is_err());
        assert!(cv
            .generate_time_series_folds(10, &TimeSeriesFoldConfig::rolling(2).with_horizon(0))
            .is_err());
        assert!(cv
            .generate_time_series_folds(10, &TimeSeriesFoldConfig::rolling(2).with_max_folds(0))
            .is_err());
    }

    #[test]
    fn test_time_series_too_short() {
        let folds = CrossValidator::new()
            .generate_time_series_folds(3, &TimeSeriesFoldConfig::rolling(3))
            .unwrap();
        assert!(folds.is_empty());
    }

    #[test]
    fn test_fold_check() {
        let overlapping = Fold {
            train_indices: vec![0, 1, 2],
            validation_indices: vec![2, 3],
        };
        assert!(matches!(
            overlapping.check(4),
            Err(ValidationError::InvalidParameter { .. })
        ));

        let out_of_range = Fold {
            train_indices: vec![0],
            validation_indices: vec![4],
        };
        assert!(matches!(
            out_of_range.check(4),
            Err(ValidationError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_validate_model_creates_fresh_model_per_fold() {
        let data = binary_data(40);
        let created = Cell::new(0);
        let factory = || {
            created.set(created.get() + 1);
            MajorityModel::default()
        };

        let config = CrossValidationConfig {
            folds: 4,
            stratified: false,
            seed: Some(1),
        };
        let results = CrossValidator::new()
            .validate_model(&factory, &data, &config)
            .unwrap();

        assert_eq!(created.get(), 4);
        assert_eq!(results.fold_metrics.len(), 4);
        // Majority is always 0; a quarter of the rows are 1
        let total = results.overall_confusion_matrix.unwrap();
        assert_eq!(total.total(), 40);
        assert_eq!(total.false_negatives, 10);
        assert_eq!(total.true_negatives, 30);
        assert!((results.overall_scores.unwrap().accuracy - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_validate_model_reports_model_failure() {
        struct Failing;
        impl Model for Failing {
            type Error = &'static str;
            fn fit(&mut self, _: &dyn Dataset) -> Result<(), &'static str> {
                Err("diverged")
            }
            fn predict(&self, _: &dyn Dataset) -> Result<Vec<f64>, &'static str> {
                Ok(Vec::new())
            }
        }

        let data = binary_data(10);
        let err = CrossValidator::new()
            .validate_model(&|| Failing, &data, &CrossValidationConfig::default())
            .unwrap_err();
        match err {
            ValidationError::ModelError { fold, reason } => {
                assert_eq!(fold, 0);
                assert_eq!(reason, "diverged");
            }
            other => panic!("Expected ModelError, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_model_cancelled() {
        let data = binary_data(20);
        let flag = Arc::new(AtomicBool::new(true));
        let err = CrossValidator::new()
            .with_cancellation(flag)
            .validate_model(
                &MajorityModel::default,
                &data,
                &CrossValidationConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Cancelled { completed_folds: 0 }
        ));
    }
}
