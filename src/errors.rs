//! Error types and argument validation for the statistics and validation core.
//!
//! Only invalid shapes, invalid configuration, failing caller models and
//! strict-mode leakage findings are errors. Degenerate-but-valid input (empty
//! series, single points, zero variance) never produces an error; the numeric
//! functions return documented sentinel values instead.

use crate::data_leakage::LeakageIssue;
use thiserror::Error;

/// Error types for validation-core operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ValidationError {
    /// Not enough samples for the requested operation.
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData {
        /// Minimum required samples
        required: usize,
        /// Actual number of samples provided
        actual: usize,
    },

    /// Invalid parameter value in a configuration or call.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Two arrays that must be index-aligned have different lengths.
    #[error("Length mismatch in {context}: {left} vs {right}")]
    LengthMismatch {
        /// What was being compared
        context: String,
        /// Length of the first array
        left: usize,
        /// Length of the second array
        right: usize,
    },

    /// A row index does not address a row of the dataset.
    #[error("Index {index} out of range for dataset of {len} rows")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Number of rows in the dataset
        len: usize,
    },

    /// A caller-supplied model failed to fit or predict.
    #[error("Model failed on fold {fold}: {reason}")]
    ModelError {
        /// Zero-based fold index
        fold: usize,
        /// Failure reason reported by the model
        reason: String,
    },

    /// A model returned a different number of predictions than validation rows.
    #[error("Model on fold {fold} returned {actual} predictions for {expected} validation rows")]
    PredictionCountMismatch {
        /// Zero-based fold index
        fold: usize,
        /// Number of validation rows
        expected: usize,
        /// Number of predictions returned
        actual: usize,
    },

    /// The caller aborted a validation run between folds.
    #[error("Validation cancelled after {completed_folds} completed folds")]
    Cancelled {
        /// Number of folds fully evaluated before the abort
        completed_folds: usize,
    },

    /// Strict-mode leakage analysis found at least one high-severity issue.
    #[error("High-risk data leakage detected:\n- {}", .summary.join("\n- "))]
    LeakageDetected {
        /// One line per issue, in detection order
        summary: Vec<String>,
        /// Every issue found, not only the high-severity ones
        issues: Vec<LeakageIssue>,
    },
}

/// Result type for validation-core operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates that a parameter is within inclusive bounds.
///
/// # Example
/// ```rust
/// use robust_validation::errors::validate_parameter;
///
/// assert!(validate_parameter(0.5, 0.0, 1.0, "threshold").is_ok());
/// assert!(validate_parameter(1.5, 0.0, 1.0, "threshold").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> ValidationResult<()> {
    if value.is_nan() {
        return Err(ValidationError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if value < min || value > max {
        Err(ValidationError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that a fraction lies in `[0, 1]`.
pub fn validate_fraction(value: f64, name: &str) -> ValidationResult<()> {
    validate_parameter(value, 0.0, 1.0, name)
}

/// Validates that a count-like parameter is strictly positive.
///
/// # Example
/// ```rust
/// use robust_validation::errors::validate_positive;
///
/// assert!(validate_positive(3, "window_size").is_ok());
/// assert!(validate_positive(0, "window_size").is_err());
/// ```
pub fn validate_positive(value: usize, name: &str) -> ValidationResult<()> {
    if value == 0 {
        Err(ValidationError::InvalidParameter {
            parameter: name.to_string(),
            value: 0.0,
            constraint: "> 0".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validates that two index-aligned arrays have the same length.
pub fn validate_same_length(left: usize, right: usize, context: &str) -> ValidationResult<()> {
    if left != right {
        Err(ValidationError::LengthMismatch {
            context: context.to_string(),
            left,
            right,
        })
    } else {
        Ok(())
    }
}

/// Validates that every index addresses a row in `[0, len)`.
///
/// Returns on the first offending index.
pub fn validate_indices_in_range(indices: &[usize], len: usize) -> ValidationResult<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(ValidationError::IndexOutOfRange { index, len }),
        None => Ok(()),
    }
}
