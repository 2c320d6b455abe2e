//! Huber-loss linear regression fitted by iteratively reweighted least squares.
//!
//! The fit starts from ordinary least squares. Each iteration computes the
//! residuals, estimates their scale robustly (normal-consistent MAD, falling
//! back to the sample standard deviation floored at `1e-6`), assigns Huber
//! weights
//!
//! ```text
//! w_i = 1                      if |r_i| ≤ δ·s
//! w_i = δ·s / |r_i|            otherwise
//! ```
//!
//! and refits by weighted least squares. Iteration stops once both the slope
//! and the intercept move by less than the tolerance.

use crate::math_utils::{constants::MIN_SCALE_VARIANCE, finite_pairs, kahan_sum};
use crate::robust_stats::{mad, median, variance, MadScale};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hyperparameters for [`huber_regression`].
///
/// Non-positive or non-finite values are replaced by the defaults at fit time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HuberConfig {
    /// Huber threshold in units of the residual scale
    pub delta: f64,
    /// Maximum number of reweighting iterations
    pub max_iter: usize,
    /// Convergence tolerance on slope and intercept changes
    pub tol: f64,
}

impl Default for HuberConfig {
    fn default() -> Self {
        Self {
            delta: 1.345,
            max_iter: 50,
            tol: 1e-6,
        }
    }
}

impl HuberConfig {
    /// Replaces unusable values with the defaults.
    fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            delta: if self.delta.is_finite() && self.delta > 0.0 {
                self.delta
            } else {
                defaults.delta
            },
            max_iter: if self.max_iter > 0 {
                self.max_iter
            } else {
                defaults.max_iter
            },
            tol: if self.tol.is_finite() && self.tol > 0.0 {
                self.tol
            } else {
                defaults.tol
            },
        }
    }
}

/// Outcome of a single robust fit. `y ≈ intercept + slope · x`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionResult {
    /// Fitted slope
    pub slope: f64,
    /// Fitted intercept
    pub intercept: f64,
    /// Reweighting iterations performed
    pub iterations: usize,
    /// Whether the parameter changes fell below the tolerance
    pub converged: bool,
    /// Final Huber weight per input pair; `0.0` for pairs that were dropped
    pub weights: Vec<f64>,
}

impl RegressionResult {
    /// Fitted value at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Coefficient of determination of this fit on the finite pairs of `x`, `y`.
    ///
    /// Clamped to `[0, 1]`; `0.0` when `y` has no spread or fewer than two
    /// pairs are valid.
    pub fn r_squared(&self, x: &[f64], y: &[f64]) -> f64 {
        let (xs, ys, _) = finite_pairs(x, y);
        if xs.len() < 2 {
            return 0.0;
        }

        let mean_y = kahan_sum(&ys) / ys.len() as f64;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (&xi, &yi) in xs.iter().zip(ys.iter()) {
            let residual = yi - self.predict(xi);
            ss_res += residual * residual;
            ss_tot += (yi - mean_y) * (yi - mean_y);
        }

        if ss_tot <= 0.0 {
            return 0.0;
        }
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    }
}

/// Robust simple linear regression with Huber weights.
///
/// Pairs `x[i]` with `y[i]` over the shorter length and keeps only pairs where
/// both are finite. With fewer than two valid pairs the result is
/// `slope = 0`, `intercept = median(y)` (or `0` without any pair) and
/// `converged = false`.
///
/// # Example
/// ```rust
/// use robust_validation::robust_regression::{huber_regression, HuberConfig};
///
/// let x = [0.0, 1.0, 2.0, 3.0, 4.0];
/// let y: Vec<f64> = x.iter().map(|v| 3.0 + 0.5 * v).collect();
/// let fit = huber_regression(&x, &y, &HuberConfig::default());
///
/// assert!((fit.slope - 0.5).abs() < 1e-9);
/// assert!((fit.intercept - 3.0).abs() < 1e-9);
/// assert!(fit.converged);
/// ```
pub fn huber_regression(x: &[f64], y: &[f64], config: &HuberConfig) -> RegressionResult {
    let n = x.len().min(y.len());
    let (xs, ys, positions) = finite_pairs(x, y);
    let m = xs.len();

    if m < 2 {
        return RegressionResult {
            slope: 0.0,
            intercept: if m > 0 { median(&ys) } else { 0.0 },
            iterations: 0,
            converged: false,
            weights: vec![0.0; n],
        };
    }

    let config = config.sanitized();

    let (mut slope, mut intercept) = ordinary_least_squares(&xs, &ys);
    let mut weights = vec![1.0; m];
    let mut residuals = vec![0.0; m];
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 0..config.max_iter {
        iterations = iteration + 1;

        for i in 0..m {
            residuals[i] = ys[i] - (intercept + slope * xs[i]);
        }

        let threshold = config.delta * residual_scale(&residuals);
        for (w, &r) in weights.iter_mut().zip(residuals.iter()) {
            let magnitude = r.abs();
            *w = if magnitude <= threshold {
                1.0
            } else {
                threshold / magnitude
            };
        }

        let Some((next_slope, next_intercept)) = weighted_least_squares(&xs, &ys, &weights, slope)
        else {
            break;
        };

        let slope_change = (next_slope - slope).abs();
        let intercept_change = (next_intercept - intercept).abs();
        slope = next_slope;
        intercept = next_intercept;

        if slope_change < config.tol && intercept_change < config.tol {
            converged = true;
            break;
        }
    }

    if !converged {
        log::debug!(
            "Huber regression stopped after {} iterations without converging (slope={}, intercept={})",
            iterations,
            slope,
            intercept
        );
    }

    let mut aligned = vec![0.0; n];
    for (&position, &w) in positions.iter().zip(weights.iter()) {
        aligned[position] = w;
    }

    RegressionResult {
        slope,
        intercept,
        iterations,
        converged,
        weights: aligned,
    }
}

/// OLS starting point; slope is `0` when `x` has no spread.
fn ordinary_least_squares(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean_x = kahan_sum(xs) / n;
    let mean_y = kahan_sum(ys) / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&xi, &yi) in xs.iter().zip(ys.iter()) {
        let dx = xi - mean_x;
        sxy += dx * (yi - mean_y);
        sxx += dx * dx;
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}

/// Weighted refit. Keeps `previous_slope` when the weighted spread of `x` is
/// zero and returns `None` when the weights sum to zero.
fn weighted_least_squares(
    xs: &[f64],
    ys: &[f64],
    weights: &[f64],
    previous_slope: f64,
) -> Option<(f64, f64)> {
    let total = kahan_sum(weights);
    if total <= 0.0 {
        return None;
    }

    let mut xw = 0.0;
    let mut yw = 0.0;
    for ((&xi, &yi), &w) in xs.iter().zip(ys.iter()).zip(weights.iter()) {
        xw += w * xi;
        yw += w * yi;
    }
    let x_bar = xw / total;
    let y_bar = yw / total;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for ((&xi, &yi), &w) in xs.iter().zip(ys.iter()).zip(weights.iter()) {
        let dx = xi - x_bar;
        sxx += w * dx * dx;
        sxy += w * dx * (yi - y_bar);
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { previous_slope };
    Some((slope, y_bar - slope * x_bar))
}

/// Normal-consistent MAD of the residuals, or the floored sample standard
/// deviation when the MAD vanishes.
fn residual_scale(residuals: &[f64]) -> f64 {
    let scale = mad(residuals, MadScale::Normal);
    if scale > 0.0 {
        scale
    } else {
        variance(residuals, true).max(MIN_SCALE_VARIANCE).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_exact_line_converges_quickly() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 0.5 * v).collect();
        let fit = huber_regression(&x, &y, &HuberConfig::default());

        assert_approx_eq!(fit.slope, 0.5, 1e-9);
        assert_approx_eq!(fit.intercept, 3.0, 1e-9);
        assert!(fit.converged);
        assert!(fit.iterations <= 5);
        assert_eq!(fit.weights, vec![1.0; 5]);
    }

    #[test]
    fn test_single_point() {
        let fit = huber_regression(&[2.0], &[7.0], &HuberConfig::default());
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 7.0);
        assert!(!fit.converged);
        assert_eq!(fit.iterations, 0);
    }

    #[test]
    fn test_empty_input() {
        let fit = huber_regression(&[], &[], &HuberConfig::default());
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 0.0);
        assert!(!fit.converged);
        assert!(fit.weights.is_empty());
    }

    #[test]
    fn test_non_finite_pairs_are_dropped() {
        let x = [0.0, 1.0, f64::NAN, 3.0, 4.0, 5.0];
        let y = [1.0, 3.0, 5.0, f64::INFINITY, 9.0, 11.0];
        let fit = huber_regression(&x, &y, &HuberConfig::default());

        assert_approx_eq!(fit.slope, 2.0, 1e-9);
        assert_approx_eq!(fit.intercept, 1.0, 1e-9);
        assert_eq!(fit.weights.len(), 6);
        assert_eq!(fit.weights[2], 0.0);
        assert_eq!(fit.weights[3], 0.0);
        assert_eq!(fit.weights[0], 1.0);
    }

    #[test]
    fn test_outlier_is_downweighted() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mut y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.0 + 2.0 * v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        y[19] = 500.0;

        let robust = huber_regression(&x, &y, &HuberConfig::default());
        let (ols_slope, _) = ordinary_least_squares(&x, &y);

        assert!((robust.slope - 2.0).abs() < (ols_slope - 2.0).abs());
        assert!(robust.weights[19] < 0.1);
        assert!(robust.weights[3] > 0.9);
    }

    #[test]
    fn test_constant_x_keeps_zero_slope() {
        let fit = huber_regression(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0], &HuberConfig::default());
        assert_eq!(fit.slope, 0.0);
        assert_approx_eq!(fit.intercept, 2.0, 1e-12);
        assert!(fit.converged);
    }

    #[test]
    fn test_config_sanitized() {
        let config = HuberConfig {
            delta: -1.0,
            max_iter: 0,
            tol: f64::NAN,
        };
        let clean = config.sanitized();
        assert_eq!(clean, HuberConfig::default());
    }

    #[test]
    fn test_predict_and_r_squared() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = huber_regression(&x, &y, &HuberConfig::default());
        assert_approx_eq!(fit.predict(10.0), 21.0, 1e-9);
        assert_approx_eq!(fit.r_squared(&x, &y), 1.0, 1e-12);
        assert_eq!(fit.r_squared(&[1.0, 2.0], &[4.0, 4.0]), 0.0);
    }
}
