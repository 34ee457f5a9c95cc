//! Significance of a Pearson correlation coefficient.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::types::TestResult;

use super::significance_interpretation;

/// t-test significance for a correlation r over n paired observations.
///
/// t = r * sqrt((n - 2) / (1 - r^2)), with the p-value read from a fixed
/// two-tier critical-value table (large-df tier at df >= 30). The returned
/// p is non-increasing in |r| for fixed n and non-increasing in n for fixed
/// |r| > 0.
pub fn correlation_significance(r: f64, n: u64) -> TestResult {
    if n < 3 {
        return TestResult::new(0.0, 1.0, "insufficient sample (n < 3)");
    }
    if r.abs() >= 1.0 {
        let p = if r == 0.0 { 1.0 } else { 0.0 };
        // t diverges at |r| = 1; report a capped statistic so the JSON stays finite.
        return TestResult::new(1e12, p, "perfect correlation");
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let t_abs = t.abs();

    let p = if df >= 30.0 {
        if t_abs < 1.96 {
            0.1
        } else if t_abs < 2.58 {
            0.05
        } else if t_abs < 3.29 {
            0.01
        } else {
            0.001
        }
    } else if t_abs < 2.0 {
        0.1
    } else if t_abs < 2.5 {
        0.05
    } else if t_abs < 3.5 {
        0.01
    } else {
        0.001
    };

    TestResult::new(t, p, significance_interpretation(p))
}

/// Exact two-tailed p-value from the Student-t distribution.
///
/// Diagnostic companion to [`correlation_significance`]; the report always
/// quotes the table value.
pub fn exact_correlation_p(r: f64, n: u64) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 0.9999 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
        Err(_) => 1.0,
    }
}
