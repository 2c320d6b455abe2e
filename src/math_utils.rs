//! Numeric helpers shared by the statistics modules.
//!
//! Every public statistic in this crate treats non-finite entries (NaN, ±∞) as
//! absent. The filtering, ordering and summation primitives that implement that
//! rule live here so the individual estimators stay focused on their formulas.

/// Numerical constants used across the crate.
pub mod constants {
    /// Normal-consistency factor for the median absolute deviation.
    ///
    /// `1 / Φ⁻¹(3/4)`; makes the MAD an unbiased estimate of σ for Gaussian data.
    pub const MAD_NORMAL_CONSTANT: f64 = 1.4826;

    /// Smallest positive value used as a floor to avoid division by zero in
    /// continued-fraction evaluation.
    pub const FPMIN: f64 = 1e-300;

    /// Clamp distance from 0 and 1 for arguments of the incomplete beta function.
    pub const BETA_X_EPSILON: f64 = 1e-15;

    /// Floor for a variance-based scale estimate.
    pub const MIN_SCALE_VARIANCE: f64 = 1e-12;

    /// Smallest reported p-value.
    pub const MIN_P_VALUE: f64 = 1e-16;

    /// ln(π)
    pub const LN_PI: f64 = 1.144_729_885_849_400_2;

    /// ln(2π) / 2
    pub const HALF_LN_TWO_PI: f64 = 0.918_938_533_204_672_8;
}

/// NaN-tolerant total ordering for `f64`, pushing NaN to the end.
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
    }
}

/// Copies the finite entries of `values`, preserving order.
pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Pairs `x[i]` with `y[i]` over the common prefix, dropping a pair when either
/// side is non-finite.
///
/// Returns the surviving pairs as two aligned vectors plus the original index
/// of every surviving pair.
pub fn finite_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<usize>) {
    let n = x.len().min(y.len());
    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    let mut positions = Vec::with_capacity(n);

    for (i, (&xi, &yi)) in x.iter().zip(y.iter()).enumerate() {
        if xi.is_finite() && yi.is_finite() {
            xs.push(xi);
            ys.push(yi);
            positions.push(i);
        }
    }

    (xs, ys, positions)
}

/// Median of already-sorted, already-filtered data. Returns `0.0` when empty.
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Clamps `value` into `[min, max]`, swapping the bounds if given in reverse.
///
/// Infinite input maps to the matching bound; NaN is returned unchanged so
/// callers can still detect a domain error.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    let (lo, hi) = if min > max { (max, min) } else { (min, max) };
    if value.is_nan() {
        return value;
    }
    value.max(lo).min(hi)
}

/// Kahan-Babuška-Neumaier compensated summation.
///
/// Keeps the accumulated rounding error separate and adds it back at the end;
/// the error bound is O(ε) instead of O(nε) for naive summation.
pub fn kahan_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;

    for &value in values {
        let t = sum + value;
        if sum.abs() >= value.abs() {
            compensation += (sum - t) + value;
        } else {
            compensation += (value - t) + sum;
        }
        sum = t;
    }

    sum + compensation
}
