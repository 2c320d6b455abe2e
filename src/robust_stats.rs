//! Outlier-resistant descriptive statistics.
//!
//! Location and spread are estimated from order statistics (median, MAD) so a
//! handful of extreme points cannot drag the estimates. Classical moments
//! ([`mean`], [`variance`], [`std_dev`]) are provided alongside for comparison
//! and for the regression scale fallback.
//!
//! Every function skips non-finite entries and returns `0.0` for an empty
//! valid set rather than failing.

use crate::math_utils::{
    constants::MAD_NORMAL_CONSTANT, finite_values, float_total_cmp, kahan_sum, median_of_sorted,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scaling applied to the raw median absolute deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MadScale {
    /// Multiply by 1.4826 so the MAD estimates σ for Gaussian data
    #[default]
    Normal,
    /// Unscaled median of absolute deviations
    Raw,
}

/// Options for [`z_scores_median`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ZScoreOptions {
    /// Multiplier applied to the raw MAD to form the scale
    pub constant: f64,
    /// Explicit center; defaults to the median of the finite entries
    pub center: Option<f64>,
}

impl Default for ZScoreOptions {
    fn default() -> Self {
        Self {
            constant: MAD_NORMAL_CONSTANT,
            center: None,
        }
    }
}

impl ZScoreOptions {
    /// Options centered at a fixed value instead of the sample median.
    pub fn centered_at(center: f64) -> Self {
        Self {
            center: Some(center),
            ..Self::default()
        }
    }
}

/// Arithmetic mean of the finite entries; `0.0` when there are none.
pub fn mean(values: &[f64]) -> f64 {
    let valid = finite_values(values);
    if valid.is_empty() {
        return 0.0;
    }
    kahan_sum(&valid) / valid.len() as f64
}

/// Variance of the finite entries.
///
/// `sample = true` divides by `n − 1`, otherwise by `n`. Fewer than two valid
/// entries give `0.0`.
pub fn variance(values: &[f64], sample: bool) -> f64 {
    let valid = finite_values(values);
    let n = valid.len();
    if n < 2 {
        return 0.0;
    }

    let m = kahan_sum(&valid) / n as f64;
    let squared: Vec<f64> = valid.iter().map(|&v| (v - m) * (v - m)).collect();
    let denominator = if sample { n - 1 } else { n };
    kahan_sum(&squared) / denominator as f64
}

/// Sample standard deviation of the finite entries.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values, true).sqrt()
}

/// Median of the finite entries; `0.0` when there are none.
///
/// # Example
/// ```rust
/// use robust_validation::robust_stats::median;
///
/// assert_eq!(median(&[3.0, 1.0, 4.0, 2.0]), 2.5);
/// assert_eq!(median(&[]), 0.0);
/// assert_eq!(median(&[f64::NAN, 5.0, f64::INFINITY]), 5.0);
/// ```
pub fn median(values: &[f64]) -> f64 {
    let mut valid = finite_values(values);
    valid.sort_by(float_total_cmp);
    median_of_sorted(&valid)
}

/// Median absolute deviation from the median.
///
/// Returns `0.0` for an empty valid set or when at least half of the points
/// coincide with the median.
///
/// # Example
/// ```rust
/// use robust_validation::robust_stats::{mad, MadScale};
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(mad(&data, MadScale::Raw), 1.0);
/// assert!((mad(&data, MadScale::Normal) - 1.4826).abs() < 1e-12);
/// ```
pub fn mad(values: &[f64], scale: MadScale) -> f64 {
    let raw = raw_mad(&finite_values(values));
    if raw == 0.0 {
        return 0.0;
    }
    match scale {
        MadScale::Normal => MAD_NORMAL_CONSTANT * raw,
        MadScale::Raw => raw,
    }
}

/// Unscaled MAD of already-filtered values.
fn raw_mad(valid: &[f64]) -> f64 {
    if valid.is_empty() {
        return 0.0;
    }
    let mut sorted = valid.to_vec();
    sorted.sort_by(float_total_cmp);
    let center = median_of_sorted(&sorted);

    let mut deviations: Vec<f64> = sorted.iter().map(|&v| (v - center).abs()).collect();
    deviations.sort_by(float_total_cmp);
    median_of_sorted(&deviations)
}

/// Robust z-scores `(x − center) / (MAD · constant)`.
///
/// The output has the same length as `values`. Non-finite inputs map to `0.0`
/// in place, and when the scale is zero (constant data, fewer than two distinct
/// values around the median, or an empty valid set) every score is `0.0`.
///
/// A non-finite `center` or `constant` in `options` falls back to the default.
///
/// # Example
/// ```rust
/// use robust_validation::robust_stats::{z_scores_median, ZScoreOptions};
///
/// let scores = z_scores_median(&[9.0, 10.0, 10.0, 11.0, 100.0], &ZScoreOptions::default());
/// assert_eq!(scores.len(), 5);
/// assert!(scores[4].abs() > 5.0);
/// ```
pub fn z_scores_median(values: &[f64], options: &ZScoreOptions) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let valid = finite_values(values);
    let center = match options.center {
        Some(c) if c.is_finite() => c,
        _ => median(&valid),
    };
    let constant = if options.constant.is_finite() {
        options.constant
    } else {
        MAD_NORMAL_CONSTANT
    };

    let scale = raw_mad(&valid) * constant;
    if scale == 0.0 || !scale.is_finite() {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|&x| if x.is_finite() { (x - center) / scale } else { 0.0 })
        .collect()
}
