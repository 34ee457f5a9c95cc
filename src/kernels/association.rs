//! Chi-square test of independence over a contingency matrix.

use crate::types::TestResult;

use super::significance_interpretation;

/// Chi-square outcome plus the derived effect sizes.
#[derive(Debug, Clone)]
pub struct AssociationOutcome {
    pub test: TestResult,
    pub cramers_v: f64,
    pub contingency_coefficient: f64,
    pub degrees_of_freedom: usize,
    pub total_observations: u64,
    /// True when more than 20% of expected cells fell below 5 and the
    /// p-value was forced to 1.
    pub assumptions_violated: bool,
}

impl AssociationOutcome {
    fn violated(reason: &str) -> Self {
        Self {
            test: TestResult::new(0.0, 1.0, reason),
            cramers_v: 0.0,
            contingency_coefficient: 0.0,
            degrees_of_freedom: 0,
            total_observations: 0,
            assumptions_violated: true,
        }
    }
}

/// Chi-square critical values by degrees of freedom:
/// (df, crit_0.10, crit_0.05, crit_0.01, crit_0.001).
const CHI_SQUARE_TABLE: &[(usize, f64, f64, f64, f64)] = &[
    (1, 2.706, 3.841, 6.635, 10.828),
    (2, 4.605, 5.991, 9.210, 13.816),
    (3, 6.251, 7.815, 11.345, 16.266),
    (4, 7.779, 9.488, 13.277, 18.467),
    (5, 9.236, 11.070, 15.086, 20.515),
    (6, 10.645, 12.592, 16.812, 22.458),
    (7, 12.017, 14.067, 18.475, 24.322),
    (8, 13.362, 15.507, 20.090, 26.125),
    (9, 14.684, 16.919, 21.666, 27.877),
    (10, 15.987, 18.307, 23.209, 29.588),
    (12, 18.549, 21.026, 26.217, 32.910),
    (15, 22.307, 24.996, 30.578, 37.697),
    (20, 28.412, 31.410, 37.566, 45.315),
    (25, 34.382, 37.652, 44.314, 52.620),
    (30, 40.256, 43.773, 50.892, 59.703),
];

/// Piecewise p-value for a chi-square statistic, keyed on df via the
/// largest tabulated df not exceeding the requested one.
pub(crate) fn chi_square_p(statistic: f64, df: usize) -> f64 {
    let row = CHI_SQUARE_TABLE
        .iter()
        .rev()
        .find(|(table_df, ..)| *table_df <= df)
        .unwrap_or(&CHI_SQUARE_TABLE[0]);
    let (_, p10, p05, p01, p001) = *row;
    if statistic >= p001 {
        0.001
    } else if statistic >= p01 {
        0.01
    } else if statistic >= p05 {
        0.05
    } else if statistic >= p10 {
        0.1
    } else {
        0.5
    }
}

/// Pearson chi-square over an R x C matrix of observed counts.
///
/// When more than 20% of expected cells are below 5 the test is reported
/// with p = 1 and "assumptions violated"; the statistic and effect sizes
/// are still zeroed so a degenerate pair never looks significant.
pub fn chi_square_independence(observed: &[Vec<u64>]) -> AssociationOutcome {
    let rows = observed.len();
    let cols = observed.first().map_or(0, Vec::len);
    if rows < 2 || cols < 2 {
        return AssociationOutcome::violated("matrix smaller than 2x2");
    }
    if observed.iter().any(|r| r.len() != cols) {
        return AssociationOutcome::violated("ragged contingency matrix");
    }

    let row_totals: Vec<f64> = observed
        .iter()
        .map(|r| r.iter().sum::<u64>() as f64)
        .collect();
    let col_totals: Vec<f64> = (0..cols)
        .map(|j| observed.iter().map(|r| r[j]).sum::<u64>() as f64)
        .collect();
    let n: f64 = row_totals.iter().sum();
    if n <= 0.0 {
        return AssociationOutcome::violated("empty contingency matrix");
    }

    let mut statistic = 0.0;
    let mut low_expected = 0usize;
    for (i, row) in observed.iter().enumerate() {
        for (j, &obs) in row.iter().enumerate() {
            let expected = row_totals[i] * col_totals[j] / n;
            if expected < 5.0 {
                low_expected += 1;
            }
            if expected > 0.0 {
                let diff = obs as f64 - expected;
                statistic += diff * diff / expected;
            }
        }
    }

    let cell_count = rows * cols;
    let df = (rows - 1) * (cols - 1);

    if low_expected as f64 > 0.2 * cell_count as f64 {
        let mut outcome = AssociationOutcome::violated("assumptions violated");
        outcome.degrees_of_freedom = df;
        outcome.total_observations = n as u64;
        return outcome;
    }

    let p = chi_square_p(statistic, df);
    let min_dim = (rows - 1).min(cols - 1) as f64;
    let cramers_v = (statistic / (n * min_dim)).sqrt().clamp(0.0, 1.0);
    let contingency = (statistic / (statistic + n)).sqrt();

    AssociationOutcome {
        test: TestResult::new(statistic, p, significance_interpretation(p)),
        cramers_v,
        contingency_coefficient: contingency,
        degrees_of_freedom: df,
        total_observations: n as u64,
        assumptions_violated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_association_is_significant() {
        // Near-diagonal matrix with comfortable expected counts.
        let observed = vec![vec![40u64, 5], vec![5, 40]];
        let outcome = chi_square_independence(&observed);
        assert!(!outcome.assumptions_violated);
        assert!(outcome.test.p_value <= 0.001);
        assert!(outcome.cramers_v > 0.7);
        assert_eq!(outcome.degrees_of_freedom, 1);
    }

    #[test]
    fn independent_matrix_is_not_significant() {
        let observed = vec![vec![25u64, 25], vec![25, 25]];
        let outcome = chi_square_independence(&observed);
        assert!(outcome.test.p_value > 0.1);
        assert!(outcome.cramers_v < 0.01);
    }

    #[test]
    fn sparse_matrix_violates_assumptions() {
        let observed = vec![vec![1u64, 2], vec![2, 1]];
        let outcome = chi_square_independence(&observed);
        assert!(outcome.assumptions_violated);
        assert_eq!(outcome.test.p_value, 1.0);
        assert_eq!(outcome.test.interpretation, "assumptions violated");
        assert_eq!(outcome.cramers_v, 0.0);
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        assert!(chi_square_independence(&[vec![1, 2, 3]]).assumptions_violated);
        assert!(chi_square_independence(&[]).assumptions_violated);
        let ragged = vec![vec![10u64, 10], vec![10]];
        assert!(chi_square_independence(&ragged).assumptions_violated);
    }

    #[test]
    fn p_table_steps_down_with_statistic() {
        assert_eq!(chi_square_p(1.0, 1), 0.5);
        assert_eq!(chi_square_p(3.0, 1), 0.1);
        assert_eq!(chi_square_p(4.0, 1), 0.05);
        assert_eq!(chi_square_p(7.0, 1), 0.01);
        assert_eq!(chi_square_p(11.0, 1), 0.001);
    }
}
