//! Pearson correlation and its two-tailed significance.
//!
//! The p-value uses a Student-t CDF obtained by adaptive Simpson integration
//! of the t density ([`t_cdf`]). A closed-form CDF through the regularized
//! incomplete beta function ([`student_t_cdf`]) is provided as an independent
//! cross-check of the quadrature.

use crate::math_utils::{
    clamp,
    constants::{MIN_P_VALUE, LN_PI},
    finite_pairs, kahan_sum,
};
use crate::special_functions::{log_gamma, regularized_incomplete_beta};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Absolute tolerance of the adaptive Simpson quadrature.
const SIMPSON_TOLERANCE: f64 = 1e-12;

/// Recursion cap of the adaptive Simpson quadrature.
const SIMPSON_MAX_DEPTH: u32 = 30;

/// Pearson coefficient together with its two-tailed p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrelationTest {
    /// Pearson r in `[-1, 1]`
    pub coefficient: f64,
    /// Two-tailed p-value for H0: ρ = 0
    pub p_value: f64,
    /// Number of index-aligned pairs where both values were finite
    pub sample_size: usize,
}

impl CorrelationTest {
    /// Whether the p-value falls strictly below `alpha`.
    pub fn is_significant_at(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Pearson product-moment correlation.
///
/// Pairs `x[i]` with `y[i]` over the shorter length and drops a pair if either
/// side is non-finite. Returns `0.0` with fewer than two valid pairs or when
/// either side has zero variance.
///
/// # Example
/// ```rust
/// use robust_validation::correlation::pearson_correlation;
///
/// let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[2.0, 4.0, 6.0, 8.0]);
/// assert!((r - 1.0).abs() < 1e-12);
/// assert_eq!(pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
/// ```
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let (xs, ys, _) = finite_pairs(x, y);
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }

    let mean_x = kahan_sum(&xs) / n as f64;
    let mean_y = kahan_sum(&ys) / n as f64;

    let mut numerator = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in xs.iter().zip(ys.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        numerator += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }

    clamp(numerator / (sxx * syy).sqrt(), -1.0, 1.0)
}

/// Lower-tail Student-t CDF by adaptive Simpson integration of the density.
///
/// Returns `NaN` for non-finite `t` and `0.5` when `df ≤ 0` or `df` is
/// non-finite. The density is integrated from `0` to `|t|` and the area is
/// added to or subtracted from one half by the sign of `t`.
///
/// # Example
/// ```rust
/// use robust_validation::correlation::t_cdf;
///
/// // Cauchy: F(1) = 3/4
/// assert!((t_cdf(1.0, 1.0) - 0.75).abs() < 1e-9);
/// assert_eq!(t_cdf(0.0, 7.0), 0.5);
/// assert_eq!(t_cdf(2.0, 0.0), 0.5);
/// ```
pub fn t_cdf(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    if !df.is_finite() || df <= 0.0 {
        return 0.5;
    }

    let upper = t.abs();
    let area = if upper == 0.0 {
        0.0
    } else {
        let norm = (log_gamma((df + 1.0) / 2.0) - log_gamma(df / 2.0) - 0.5 * (df.ln() + LN_PI))
            .exp();
        let exponent = -(df + 1.0) / 2.0;
        let density = |u: f64| norm * (1.0 + u * u / df).powf(exponent);

        let whole = simpson(&density, 0.0, upper);
        adaptive_simpson(
            &density,
            0.0,
            upper,
            SIMPSON_TOLERANCE,
            whole,
            SIMPSON_MAX_DEPTH,
        )
    };

    let cdf = if t >= 0.0 { 0.5 + area } else { 0.5 - area };
    clamp(cdf, 0.0, 1.0)
}

fn simpson<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> f64 {
    let mid = 0.5 * (a + b);
    (b - a) / 6.0 * (f(a) + 4.0 * f(mid) + f(b))
}

/// Recursive bisection with Richardson correction of each accepted panel.
fn adaptive_simpson<F: Fn(f64) -> f64>(
    f: &F,
    a: f64,
    b: f64,
    tolerance: f64,
    whole: f64,
    depth: u32,
) -> f64 {
    let mid = 0.5 * (a + b);
    let left = simpson(f, a, mid);
    let right = simpson(f, mid, b);
    let delta = left + right - whole;

    if depth == 0 || delta.abs() <= 15.0 * tolerance {
        return left + right + delta / 15.0;
    }

    adaptive_simpson(f, a, mid, tolerance / 2.0, left, depth - 1)
        + adaptive_simpson(f, mid, b, tolerance / 2.0, right, depth - 1)
}

/// Lower-tail Student-t CDF in closed form.
///
/// `F(t) = 1 − ½·I_{df/(df+t²)}(df/2, ½)` for `t ≥ 0`, mirrored for negative
/// `t`. Same domain rules as [`t_cdf`].
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    if !df.is_finite() || df <= 0.0 {
        return 0.5;
    }
    if t == 0.0 {
        return 0.5;
    }

    let x = df / (df + t * t);
    let tail = 0.5 * regularized_incomplete_beta(df / 2.0, 0.5, x);
    let cdf = if t > 0.0 { 1.0 - tail } else { tail };
    clamp(cdf, 0.0, 1.0)
}

/// Two-tailed p-value of a Pearson coefficient `r` over `n` pairs.
///
/// Returns `1.0` when `n < 3` or `r` is non-finite, and `0.0` for a perfect
/// correlation (`1 − r² ≤ 0`). Otherwise `p = 2·(1 − F(|t|))` with
/// `t = r·√(n−2)/√(1−r²)` and `n − 2` degrees of freedom, floored at `1e-16`.
/// For very large `|t|` the quadrature error of [`t_cdf`] (around `1e-11`)
/// dominates, so such p-values stay near that level instead of reaching the
/// floor.
///
/// # Example
/// ```rust
/// use robust_validation::correlation::p_value_for_correlation;
///
/// assert_eq!(p_value_for_correlation(0.0, 10), 1.0);
/// assert_eq!(p_value_for_correlation(1.0, 10), 0.0);
/// assert_eq!(p_value_for_correlation(0.9, 2), 1.0);
/// ```
pub fn p_value_for_correlation(r: f64, n: usize) -> f64 {
    if !r.is_finite() || n < 3 {
        return 1.0;
    }

    let df = (n - 2) as f64;
    let denominator = 1.0 - r * r;
    if denominator <= 0.0 {
        return 0.0;
    }

    let t = (r * df.sqrt() / denominator.sqrt()).abs();
    let mut p = 2.0 * (1.0 - t_cdf(t, df));
    if !p.is_finite() {
        p = 1.0;
    }
    clamp(p.max(MIN_P_VALUE), 0.0, 1.0)
}

/// Pearson coefficient plus p-value over the valid pairs of `x` and `y`.
///
/// # Example
/// ```rust
/// use robust_validation::correlation::correlation_test;
///
/// let test = correlation_test(&[1.0, 2.0, 3.0, f64::NAN], &[1.0, 3.0, 2.0, 4.0]);
/// assert_eq!(test.sample_size, 3);
/// assert!(test.p_value > 0.05);
/// ```
pub fn correlation_test(x: &[f64], y: &[f64]) -> CorrelationTest {
    let (xs, ys, _) = finite_pairs(x, y);
    let coefficient = pearson_correlation(&xs, &ys);
    CorrelationTest {
        coefficient,
        p_value: p_value_for_correlation(coefficient, xs.len()),
        sample_size: xs.len(),
    }
}

/// Symmetric matrix of pairwise Pearson coefficients.
///
/// The diagonal is `1.0`, or `0.0` for a column without spread.
pub fn correlation_matrix<C: AsRef<[f64]>>(columns: &[C]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut matrix = vec![vec![0.0; k]; k];

    for i in 0..k {
        let ci = columns[i].as_ref();
        matrix[i][i] = if pearson_correlation(ci, ci) != 0.0 {
            1.0
        } else {
            0.0
        };
        for j in (i + 1)..k {
            let r = pearson_correlation(ci, columns[j].as_ref());
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_pearson_perfect_and_symmetric() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let neg: Vec<f64> = y.iter().map(|v| -v).collect();

        assert_approx_eq!(pearson_correlation(&x, &y), 1.0, 1e-12);
        assert_approx_eq!(pearson_correlation(&x, &neg), -1.0, 1e-12);

        let a = [1.0, 3.0, 2.0, 5.0, 4.0];
        let b = [2.0, 1.0, 4.0, 3.0, 6.0];
        assert_eq!(pearson_correlation(&a, &b), pearson_correlation(&b, &a));
    }

    #[test]
    fn test_pearson_degenerate() {
        assert_eq!(pearson_correlation(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson_correlation(&[], &[]), 0.0);
        assert_eq!(
            pearson_correlation(&[1.0, f64::NAN, 3.0], &[f64::NAN, 2.0, 3.0]),
            0.0
        );
    }

    #[test]
    fn test_pearson_uses_common_prefix() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 100.0], &[1.0, 2.0, 3.0]);
        assert_approx_eq!(r, 1.0, 1e-12);
    }

    #[test]
    fn test_t_cdf_closed_forms() {
        // df = 1 is the Cauchy distribution
        assert_approx_eq!(t_cdf(1.0, 1.0), 0.75, 1e-9);
        // df = 2: F(t) = 1/2 + t / (2√(2 + t²))
        for &t in &[0.5, 1.0, 2.5] {
            let expected = 0.5 + t / (2.0 * (2.0f64 + t * t).sqrt());
            assert_approx_eq!(t_cdf(t, 2.0), expected, 1e-9);
            assert_approx_eq!(t_cdf(-t, 2.0), 1.0 - expected, 1e-9);
        }
    }

    #[test]
    fn test_t_cdf_domain() {
        assert!(t_cdf(f64::NAN, 3.0).is_nan());
        assert!(t_cdf(f64::INFINITY, 3.0).is_nan());
        assert_eq!(t_cdf(1.5, -1.0), 0.5);
        assert_eq!(t_cdf(1.5, f64::NAN), 0.5);
        assert_eq!(t_cdf(0.0, 4.0), 0.5);
    }

    #[test]
    fn test_quadrature_matches_closed_form() {
        for &df in &[1.0, 2.0, 3.0, 5.0, 10.0, 30.0] {
            for &t in &[-3.0, -1.2, -0.1, 0.3, 1.0, 2.0, 4.5] {
                assert_approx_eq!(t_cdf(t, df), student_t_cdf(t, df), 1e-8);
            }
        }
    }

    #[test]
    fn test_p_value_sentinels() {
        assert_eq!(p_value_for_correlation(0.0, 10), 1.0);
        assert_eq!(p_value_for_correlation(1.0, 10), 0.0);
        assert_eq!(p_value_for_correlation(-1.0, 10), 0.0);
        assert_eq!(p_value_for_correlation(0.5, 2), 1.0);
        assert_eq!(p_value_for_correlation(f64::NAN, 50), 1.0);
    }

    #[test]
    fn test_p_value_monotone_in_r() {
        let weak = p_value_for_correlation(0.2, 30);
        let strong = p_value_for_correlation(0.6, 30);
        assert!(strong < weak);
        assert!(strong > 0.0 && weak < 1.0);
        // Sign does not matter for a two-tailed test
        assert_approx_eq!(
            p_value_for_correlation(-0.6, 30),
            strong,
            1e-15
        );
    }

    #[test]
    fn test_p_value_floor() {
        let p = p_value_for_correlation(0.999_999, 1000);
        assert!(p >= 1e-16);
    }

    #[test]
    fn test_p_value_precision_limit_for_extreme_t() {
        // True p is far below 1e-16; quadrature error keeps it near 1e-11.
        let p = p_value_for_correlation(0.999_999_9, 100_000);
        assert!(p >= 1e-16);
        assert!(p < 1e-10, "p = {}", p);
        assert!(2.0 * (1.0 - student_t_cdf(1e4, 99_998.0)) < 1e-10);
    }

    #[test]
    fn test_correlation_test_counts_valid_pairs() {
        let x = [1.0, 2.0, f64::NAN, 4.0, 5.0];
        let y = [2.0, 4.1, 6.0, 7.9, 10.2];
        let test = correlation_test(&x, &y);
        assert_eq!(test.sample_size, 4);
        assert!(test.coefficient > 0.99);
        assert!(test.is_significant_at(0.05));
    }

    #[test]
    fn test_correlation_matrix() {
        let columns = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![4.0, 3.0, 2.0, 1.0],
            vec![7.0, 7.0, 7.0, 7.0],
        ];
        let m = correlation_matrix(&columns);
        assert_eq!(m.len(), 3);
        assert_eq!(m[0][0], 1.0);
        assert_eq!(m[2][2], 0.0);
        assert_approx_eq!(m[0][1], -1.0, 1e-12);
        assert_eq!(m[0][1], m[1][0]);
        assert_eq!(m[0][2], 0.0);
    }
}
