//! Report assembly: compose the three analysis sections, derive
//! cross-variable insights, and attach counters and metadata.
//!
//! The assembler is pure: it never recomputes statistics, only reads the
//! finalized column and pair reports. Degraded runs assemble the same shape
//! with empty sections.

use crate::types::{
    BivariateReport, ColumnDetails, ColumnReport, CrossVariableInsights, EdaAnalysis, EdaReport,
    PerformanceMetrics, QualityFlag, ReportMetadata, Warning,
};

/// Cap insight lists so a wide dataset cannot flood the report.
const MAX_FINDINGS: usize = 8;

pub fn assemble(
    columns: Vec<ColumnReport>,
    bivariate: BivariateReport,
    warnings: Vec<Warning>,
    performance_metrics: PerformanceMetrics,
    metadata: ReportMetadata,
    significance_level: f64,
) -> EdaReport {
    let cross_variable_insights = derive_insights(&columns, &bivariate, significance_level);
    EdaReport {
        eda_analysis: EdaAnalysis {
            univariate_analysis: columns,
            bivariate_analysis: bivariate,
            cross_variable_insights,
        },
        warnings,
        performance_metrics,
        metadata,
    }
}

fn derive_insights(
    columns: &[ColumnReport],
    bivariate: &BivariateReport,
    significance_level: f64,
) -> CrossVariableInsights {
    let mut top_findings = Vec::new();
    let mut quality_issues = Vec::new();
    let mut hypotheses = Vec::new();
    let mut preprocessing = Vec::new();

    // Headline findings from the pairwise section.
    for pair in bivariate
        .numeric_numeric
        .strong_correlations
        .iter()
        .take(3)
    {
        top_findings.push(format!(
            "{} and {} are {} correlated (r = {:.4}, {})",
            pair.column_a,
            pair.column_b,
            pair.strength.to_lowercase(),
            pair.correlation,
            pair.direction.to_lowercase()
        ));
        hypotheses.push(format!(
            "changes in {} may track changes in {} (or both follow a common driver)",
            pair.column_a, pair.column_b
        ));
    }
    for comparison in &bivariate.numeric_categorical.pairs {
        if comparison.anova.p_value <= significance_level {
            top_findings.push(format!(
                "{} differs across {} groups (F = {:.2}, p <= {})",
                comparison.numeric_column,
                comparison.categorical_column,
                comparison.anova.statistic,
                comparison.anova.p_value
            ));
            hypotheses.push(format!(
                "{} membership may explain variance in {}",
                comparison.categorical_column, comparison.numeric_column
            ));
        }
    }
    for association in &bivariate.categorical_categorical.pairs {
        if association.chi_square.p_value <= significance_level && association.cramers_v >= 0.3 {
            top_findings.push(format!(
                "{} is associated with {} (Cramer's V = {:.3})",
                association.column_a, association.column_b, association.cramers_v
            ));
        }
    }

    // Column-level quality issues and preprocessing ideas.
    for column in columns {
        if column.null_percentage > 20.0 {
            quality_issues.push(format!(
                "column '{}' is {:.1}% missing",
                column.name, column.null_percentage
            ));
            preprocessing.push(format!(
                "impute or drop '{}' before modeling ({:.1}% missing)",
                column.name, column.null_percentage
            ));
        } else if column.quality_flag == QualityFlag::Poor {
            quality_issues.push(format!(
                "column '{}' has poor data quality ({} of {} values valid)",
                column.name, column.valid_count, column.total_count
            ));
        }

        match &column.details {
            ColumnDetails::Categorical(details) => {
                if details.unique_percentage > 80.0 && column.valid_count > 100 {
                    quality_issues.push(format!(
                        "column '{}' is {:.1}% unique over {} values; it may be an identifier rather than a category",
                        column.name, details.unique_percentage, column.valid_count
                    ));
                }
                if details.high_cardinality_warning.is_some() {
                    preprocessing.push(format!(
                        "group or hash '{}' before one-hot encoding ({} levels)",
                        column.name, details.unique_categories
                    ));
                }
            }
            ColumnDetails::Numeric(details) => {
                if let Some(hint) = &details.patterns.log_transform_hint {
                    preprocessing.push(format!("column '{}': {hint}", column.name));
                }
                if details.outliers.flagged_total > 0
                    && details.outliers.potential_impact.starts_with("high")
                {
                    quality_issues.push(format!(
                        "column '{}' carries a heavy outlier load ({} of {} sampled values flagged)",
                        column.name,
                        details.outliers.flagged_total,
                        details.outliers.evaluated_sample_size
                    ));
                }
            }
            _ => {}
        }
    }

    top_findings.truncate(MAX_FINDINGS);
    quality_issues.truncate(MAX_FINDINGS);
    hypotheses.truncate(MAX_FINDINGS);
    preprocessing.truncate(MAX_FINDINGS);

    CrossVariableInsights {
        top_findings,
        quality_issues,
        hypotheses,
        preprocessing_recommendations: preprocessing,
    }
}
