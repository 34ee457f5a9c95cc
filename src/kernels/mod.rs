//! Statistical test kernels.
//!
//! Each kernel is a pure function from raw input (a sample, groups of
//! samples, or a contingency matrix) to a [`TestResult`]. P-values are
//! piecewise approximations from standard critical-value tables so the same
//! input always reproduces the same reported value; the Kruskal-Wallis
//! kernel uses the proper chi-square CDF instead of the coarse table.
//!
//! Kernels never fail the pass: inputs that violate a test's assumptions
//! return zeroed statistics with an "assumptions violated" interpretation
//! and leave the decision to warn to the caller.

mod association;
mod correlation;
mod normality;

pub use association::{chi_square_independence, AssociationOutcome};
pub use correlation::{correlation_significance, exact_correlation_p};
pub use group_tests::{anova_f, kruskal_wallis, GroupSummary};
pub use normality::{jarque_bera, kolmogorov_smirnov, shapiro_wilk};

/// Shared interpretation bucket for a piecewise p-value.
pub(crate) fn significance_interpretation(p: f64) -> &'static str {
    if p <= 0.001 {
        "highly significant (p <= 0.001)"
    } else if p <= 0.01 {
        "very significant (p <= 0.01)"
    } else if p <= 0.05 {
        "significant (p <= 0.05)"
    } else if p <= 0.1 {
        "marginally significant (p <= 0.1)"
    } else {
        "not significant"
    }
}
