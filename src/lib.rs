//! # Robust Validation
//!
//! Robust statistics, correlation inference and model-validation tooling for
//! analytics pipelines.
//!
//! The crate covers three layers:
//!
//! - **Numerics**: log-gamma and the regularized incomplete beta function,
//!   median/MAD based statistics, Pearson correlation with Student-t p-values,
//!   and Huber-loss robust linear regression.
//! - **Model validation**: shuffled and stratified k-fold cross-validation,
//!   rolling and expanding time-series folds, and per-fold classification or
//!   regression metrics with cross-fold aggregation.
//! - **Leakage detection**: audits of train/test splits for overlap,
//!   duplicates, chronology violations and target-contaminated features, with a
//!   strict mode that turns high-risk findings into an error.
//!
//! ## Quick Start
//!
//! ```rust
//! use robust_validation::{
//!     CrossValidationConfig, CrossValidator, Dataset, Model, TrainingData,
//! };
//!
//! /// Predicts 1 when the first feature exceeds a threshold learned from the
//! /// training rows.
//! #[derive(Default)]
//! struct Threshold {
//!     cut: f64,
//! }
//!
//! impl Model for Threshold {
//!     type Error = String;
//!
//!     fn fit(&mut self, train: &dyn Dataset) -> Result<(), String> {
//!         let n = train.len().max(1) as f64;
//!         self.cut = (0..train.len()).map(|i| train.features(i)[0]).sum::<f64>() / n;
//!         Ok(())
//!     }
//!
//!     fn predict(&self, rows: &dyn Dataset) -> Result<Vec<f64>, String> {
//!         Ok((0..rows.len())
//!             .map(|i| if rows.features(i)[0] > self.cut { 1.0 } else { 0.0 })
//!             .collect())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let values: Vec<f64> = (0..40).map(|i| i as f64).collect();
//!     let labels: Vec<f64> = values.iter().map(|&v| if v >= 20.0 { 1.0 } else { 0.0 }).collect();
//!     let data = TrainingData::from_series(&values, labels)?;
//!
//!     let config = CrossValidationConfig {
//!         folds: 4,
//!         stratified: true,
//!         seed: Some(42),
//!     };
//!     let results = CrossValidator::new().validate_model(&Threshold::default, &data, &config)?;
//!
//!     println!("mean accuracy: {:.3}", results.average.accuracy);
//!     assert_eq!(results.fold_metrics.len(), 4);
//!     Ok(())
//! }
//! ```
//!
//! ## Leakage Audit
//!
//! ```rust
//! use robust_validation::{AnalyzeOptions, LeakageDetector, LeakageDetectorConfig, Record};
//!
//! let records: Vec<Record> = vec![Record::new(); 6];
//! let detector = LeakageDetector::new(LeakageDetectorConfig::strict()).unwrap();
//!
//! let overlapping = AnalyzeOptions::new(vec![0, 1, 2], vec![2, 3, 4]);
//! assert!(detector.analyze(&records, &overlapping).is_err());
//!
//! let disjoint = AnalyzeOptions::new(vec![0, 1, 2], vec![3, 4, 5]);
//! assert!(detector.analyze(&records, &disjoint).unwrap().is_clean());
//! ```
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for configurations, metrics and reports
//! - `parallel`: `CrossValidator::validate_model_parallel` on rayon
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade: fold progress at `debug`,
//! cancellation and medium-risk leakage at `info`, high-risk leakage and empty
//! validation folds at `warn`, strict-mode aborts at `error`. Install any `log`
//! backend to see them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod errors;
pub mod math_utils;
pub mod secure_rng;
pub mod special_functions;

// Statistics
pub mod correlation;
pub mod robust_regression;
pub mod robust_stats;

// Validation
pub mod cross_validation;
pub mod data_leakage;
pub mod dataset;
pub mod metrics;

// Re-exports for convenience - main public API
pub use errors::{ValidationError, ValidationResult};

// Numerics exports
pub use correlation::{
    correlation_matrix, correlation_test, p_value_for_correlation, pearson_correlation,
    student_t_cdf, t_cdf, CorrelationTest,
};
pub use robust_regression::{huber_regression, HuberConfig, RegressionResult};
pub use robust_stats::{mad, mean, median, std_dev, variance, z_scores_median, MadScale, ZScoreOptions};
pub use special_functions::{log_gamma, regularized_incomplete_beta};

// Cross-validation exports
pub use cross_validation::{
    CrossValidationConfig, CrossValidator, Fold, Model, ModelFactory, TaskType,
    TimeSeriesFoldConfig, TimeSeriesValidationConfig, TimeSeriesValidationResults,
    ValidationResults, WindowStrategy,
};
pub use dataset::{Dataset, DatasetView, TrainingData};
pub use metrics::{
    calculate_classification_metrics, calculate_regression_metrics, ClassificationMetrics,
    ClassificationSummary, ConfusionMatrix, FoldMetrics, OverallScores, RegressionMetrics,
    RegressionSummary,
};

// Leakage detection exports
pub use data_leakage::{
    AnalyzeOptions, EntityOffender, FieldValue, LeakNamePatterns, LeakageDetails,
    LeakageDetector, LeakageDetectorConfig, LeakageIssue, LeakageKind, LeakageReport,
    LeakageThresholds, Record, Severity, SplitSide, StrictnessMode, TemporalConfig,
};
