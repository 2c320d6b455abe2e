//! Integration tests for numerical accuracy of the statistics layer
//!
//! Special functions and the Student-t distribution are cross-checked against
//! `statrs`; robust estimators are checked on contaminated data where the
//! classical estimators break down.

use assert_approx_eq::assert_approx_eq;
use robust_validation::{
    correlation_matrix, correlation_test, huber_regression, log_gamma, mad, mean, median,
    p_value_for_correlation, pearson_correlation, regularized_incomplete_beta, student_t_cdf,
    t_cdf, variance, z_scores_median, HuberConfig, MadScale, ZScoreOptions,
};
use statrs::distribution::{ContinuousCDF, StudentsT};

// ============================================================================
// SPECIAL FUNCTIONS
// ============================================================================

#[test]
fn test_log_gamma_matches_statrs() {
    for &z in &[0.1, 0.5, 1.0, 1.5, 2.0, 3.7, 10.0, 57.25, 171.0] {
        let expected = statrs::function::gamma::ln_gamma(z);
        assert!(
            (log_gamma(z) - expected).abs() < 1e-9 * expected.abs().max(1.0),
            "log_gamma({}) = {} vs statrs {}",
            z,
            log_gamma(z),
            expected
        );
    }
}

#[test]
fn test_log_gamma_recurrence() {
    // ln Γ(z + 1) = ln Γ(z) + ln z
    for &z in &[0.3, 1.2, 4.5, 20.0] {
        assert_approx_eq!(log_gamma(z + 1.0), log_gamma(z) + f64::ln(z), 1e-10);
    }
}

#[test]
fn test_incomplete_beta_matches_statrs() {
    let shapes = [(0.5, 0.5), (1.0, 3.0), (2.5, 0.5), (5.0, 5.0), (14.0, 0.5)];
    let points = [0.01, 0.2, 0.5, 0.73, 0.99];

    for &(a, b) in &shapes {
        for &x in &points {
            let expected = statrs::function::beta::beta_reg(a, b, x);
            assert!(
                (regularized_incomplete_beta(a, b, x) - expected).abs() < 1e-9,
                "I_{}({}, {}) mismatch",
                x,
                a,
                b
            );
        }
    }
}

#[test]
fn test_incomplete_beta_symmetry_and_bounds() {
    for &(a, b, x) in &[(2.0, 3.0, 0.4), (0.7, 4.2, 0.9), (9.0, 1.5, 0.05)] {
        let lhs = regularized_incomplete_beta(a, b, x);
        let rhs = 1.0 - regularized_incomplete_beta(b, a, 1.0 - x);
        assert_approx_eq!(lhs, rhs, 1e-10);
    }
    assert!(regularized_incomplete_beta(2.0, 2.0, 0.0) < 1e-12);
    assert!(regularized_incomplete_beta(2.0, 2.0, 1.0) > 1.0 - 1e-12);
}

// ============================================================================
// STUDENT-T AND CORRELATION INFERENCE
// ============================================================================

#[test]
fn test_t_cdf_matches_statrs() {
    for &df in &[1.0, 2.0, 3.0, 5.0, 12.0, 30.0, 120.0] {
        let reference = StudentsT::new(0.0, 1.0, df).unwrap();
        for &t in &[-6.0, -2.5, -1.0, -0.3, 0.0, 0.4, 1.7, 3.2, 8.0] {
            let expected = reference.cdf(t);
            assert!(
                (t_cdf(t, df) - expected).abs() < 1e-8,
                "quadrature t_cdf({}, {}) = {} vs {}",
                t,
                df,
                t_cdf(t, df),
                expected
            );
            assert!(
                (student_t_cdf(t, df) - expected).abs() < 1e-9,
                "closed-form student_t_cdf({}, {}) mismatch",
                t,
                df
            );
        }
    }
}

#[test]
fn test_t_cdf_is_monotone_and_symmetric() {
    let df = 4.0;
    let grid: Vec<f64> = (-40..=40).map(|i| i as f64 * 0.25).collect();
    for pair in grid.windows(2) {
        assert!(t_cdf(pair[1], df) >= t_cdf(pair[0], df));
    }
    for &t in &grid {
        assert_approx_eq!(t_cdf(t, df) + t_cdf(-t, df), 1.0, 1e-10);
    }
}

#[test]
fn test_p_value_matches_t_distribution() {
    let n = 25usize;
    let df = (n - 2) as f64;
    let reference = StudentsT::new(0.0, 1.0, df).unwrap();

    for &r in &[0.05, -0.2, 0.4, 0.65, -0.9] {
        let t = (r * df.sqrt() / (1.0 - r * r).sqrt()).abs();
        let expected = 2.0 * (1.0 - reference.cdf(t));
        assert_approx_eq!(p_value_for_correlation(r, n), expected.max(1e-16), 1e-8);
    }
}

#[test]
fn test_correlation_test_on_linear_trend() {
    let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&v| 0.5 * v + 3.0 * (v * 1.3).sin())
        .collect();

    let test = correlation_test(&x, &y);
    assert_eq!(test.sample_size, 40);
    assert!(test.coefficient > 0.8);
    assert!(test.is_significant_at(0.01));

    let noise: Vec<f64> = x.iter().map(|&v| (v * 2.7).sin()).collect();
    let weak = correlation_test(&x, &noise);
    assert!(weak.coefficient.abs() < 0.5);
    assert!(weak.p_value > 0.01);
}

#[test]
fn test_correlation_matrix_properties() {
    let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let b: Vec<f64> = a.iter().map(|v| -2.0 * v + 1.0).collect();
    let c: Vec<f64> = a.iter().map(|v| (v * 0.9).cos()).collect();
    let flat = vec![3.0; 20];

    let matrix = correlation_matrix(&[a.clone(), b, c, flat]);
    assert_eq!(matrix.len(), 4);
    assert_approx_eq!(matrix[0][0], 1.0, 1e-12);
    assert_approx_eq!(matrix[0][1], -1.0, 1e-12);
    assert_eq!(matrix[3][3], 0.0);
    assert_eq!(matrix[0][3], 0.0);
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(matrix[i][j], matrix[j][i]);
        }
    }
    assert_approx_eq!(matrix[0][2], pearson_correlation(&a, &matrix_column_c()), 1e-12);
}

fn matrix_column_c() -> Vec<f64> {
    (0..20).map(|i| (i as f64 * 0.9).cos()).collect()
}

// ============================================================================
// ROBUST ESTIMATORS
// ============================================================================

#[test]
fn test_robust_location_and_scale_resist_outliers() {
    let mut data: Vec<f64> = (0..99).map(|i| 10.0 + (i as f64 * 0.37).sin()).collect();
    let clean_median = median(&data);
    let clean_mad = mad(&data, MadScale::Normal);

    data.push(1e6);
    assert!((median(&data) - clean_median).abs() < 0.05);
    assert!((mad(&data, MadScale::Normal) - clean_mad).abs() < 0.05);
    assert!(mean(&data) > 1000.0);
    assert!(variance(&data, true) > 1e9);
}

#[test]
fn test_z_scores_flag_only_the_outlier() {
    let mut data: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 1.7).sin()).collect();
    data[17] = 250.0;
    data.push(f64::NAN);

    let scores = z_scores_median(&data, &ZScoreOptions::default());
    assert_eq!(scores.len(), data.len());
    assert_eq!(scores[50], 0.0);

    let flagged: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(_, z)| z.abs() > 3.5)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(flagged, vec![17]);
}

#[test]
fn test_huber_regression_resists_outliers() {
    let x: Vec<f64> = (0..30).map(|i| i as f64).collect();
    let mut y: Vec<f64> = x
        .iter()
        .map(|&v| 1.0 + 2.0 * v + 0.3 * (v * 1.1).sin())
        .collect();
    for &i in &[25, 27, 29] {
        y[i] += 100.0;
    }

    let fit = huber_regression(&x, &y, &HuberConfig::default());
    assert!((fit.slope - 2.0).abs() < 0.1, "slope {}", fit.slope);
    assert!((fit.intercept - 1.0).abs() < 0.5, "intercept {}", fit.intercept);
    assert_eq!(fit.weights.len(), 30);
    for &i in &[25, 27, 29] {
        assert!(fit.weights[i] < 0.2, "outlier weight {}", fit.weights[i]);
    }
    assert!(fit.weights[3] > 0.99);

    let ordinary_slope = {
        let mx = mean(&x);
        let my = mean(&y);
        let sxy: f64 = x.iter().zip(&y).map(|(a, b)| (a - mx) * (b - my)).sum();
        let sxx: f64 = x.iter().map(|a| (a - mx) * (a - mx)).sum();
        sxy / sxx
    };
    assert!((ordinary_slope - 2.0).abs() > (fit.slope - 2.0).abs());
}
