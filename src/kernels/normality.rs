//! Normality tests: Shapiro-Wilk (approximate), Jarque-Bera, and a
//! one-sample Kolmogorov-Smirnov against the fitted normal.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::types::TestResult;

use super::association::chi_square_p;

/// Exact Shapiro-Wilk half-coefficients for n = 3..=10. Larger samples use
/// normalized Blom scores instead.
const SW_COEFFICIENTS: &[&[f64]] = &[
    &[0.7071],
    &[0.6872, 0.1677],
    &[0.6646, 0.2413],
    &[0.6431, 0.2806, 0.0875],
    &[0.6233, 0.3031, 0.1401],
    &[0.6052, 0.3164, 0.1743, 0.0561],
    &[0.5888, 0.3244, 0.1976, 0.0947],
    &[0.5739, 0.3291, 0.2141, 0.1224, 0.0399],
];

/// Approximate Shapiro-Wilk W for n in [3, 5000].
///
/// Small samples use the tabulated coefficients; larger samples build the
/// coefficient vector from normalized expected normal order statistics.
/// The p-value is a fixed piecewise map over W.
pub fn shapiro_wilk(sample: &[f64]) -> TestResult {
    let n = sample.len();
    if !(3..=5000).contains(&n) {
        return TestResult::new(0.0, 1.0, "assumptions violated");
    }

    let mut sorted: Vec<f64> = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let ss: f64 = sorted.iter().map(|x| (x - mean).powi(2)).sum();
    if ss <= 0.0 {
        return TestResult::new(0.0, 1.0, "zero variance");
    }

    let numerator = if n <= 10 {
        let coeffs = SW_COEFFICIENTS[n - 3];
        let b: f64 = coeffs
            .iter()
            .enumerate()
            .map(|(i, &a)| a * (sorted[n - 1 - i] - sorted[i]))
            .sum();
        b * b
    } else {
        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return TestResult::new(0.0, 1.0, "assumptions violated");
        };
        let m: Vec<f64> = (1..=n)
            .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (n as f64 + 0.25)))
            .collect();
        let norm: f64 = m.iter().map(|v| v * v).sum::<f64>().sqrt();
        let b: f64 = m
            .iter()
            .zip(&sorted)
            .map(|(mi, xi)| mi / norm * xi)
            .sum();
        b * b
    };

    let w = (numerator / ss).clamp(0.0, 1.0);
    let p = if w >= 0.97 {
        0.5
    } else if w >= 0.95 {
        0.1
    } else if w >= 0.90 {
        0.05
    } else if w >= 0.85 {
        0.01
    } else {
        0.001
    };
    let interpretation = if p > 0.05 {
        "consistent with normality"
    } else {
        "departs from normality"
    };

    TestResult::new(w, p, interpretation)
}

/// Jarque-Bera from the stream moments: JB = (n/6)(s^2 + (k)^2/4) where s
/// is skewness and k excess kurtosis. P-value from the chi-square(2) table.
pub fn jarque_bera(n: u64, skewness: f64, excess_kurtosis: f64) -> TestResult {
    if n < 4 {
        return TestResult::new(0.0, 1.0, "assumptions violated");
    }
    let jb = n as f64 / 6.0 * (skewness.powi(2) + excess_kurtosis.powi(2) / 4.0);
    let p = chi_square_p(jb, 2);
    let interpretation = if p > 0.05 {
        "consistent with normality"
    } else {
        "departs from normality"
    };
    TestResult::new(jb, p, interpretation)
}

/// One-sample KS against a normal fitted to the sample itself.
///
/// D is the sup distance between the empirical CDF steps and the fitted
/// normal CDF; p comes from the Smirnov-style critical values 1.36/sqrt(n)
/// and 1.63/sqrt(n).
pub fn kolmogorov_smirnov(sample: &[f64]) -> TestResult {
    let n = sample.len();
    if n < 3 {
        return TestResult::new(0.0, 1.0, "assumptions violated");
    }

    let mut sorted: Vec<f64> = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n_f = n as f64;
    let mean = sorted.iter().sum::<f64>() / n_f;
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n_f - 1.0);
    if variance <= 0.0 {
        return TestResult::new(0.0, 1.0, "zero variance");
    }
    let std_dev = variance.sqrt();

    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return TestResult::new(0.0, 1.0, "assumptions violated");
    };

    let mut d: f64 = 0.0;
    for (i, &x) in sorted.iter().enumerate() {
        let fitted = normal.cdf((x - mean) / std_dev);
        let step_above = (i + 1) as f64 / n_f - fitted;
        let step_below = fitted - i as f64 / n_f;
        d = d.max(step_above.abs()).max(step_below.abs());
    }

    let sqrt_n = n_f.sqrt();
    let p = if d >= 1.63 / sqrt_n {
        0.01
    } else if d >= 1.36 / sqrt_n {
        0.05
    } else {
        0.5
    };
    let interpretation = if p > 0.05 {
        "no significant departure from the fitted normal"
    } else {
        "departs from the fitted normal"
    };

    TestResult::new(d, p, interpretation)
}
