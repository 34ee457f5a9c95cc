//! Report tree emitted by the engine.
//!
//! The shape is stable regardless of input size: every run produces the same
//! sections, with empty subsections and explanatory warnings on degraded
//! paths. All numbers are pre-rounded to their documented precision before
//! they land here, so serializing the tree is the entire rendering contract.

use serde::{Deserialize, Serialize};

use super::{DataType, SemanticType, Warning};

// ============================================================================
// Shared fragments
// ============================================================================

/// Outcome of one statistical test kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub interpretation: String,
}

impl TestResult {
    pub fn new(statistic: f64, p_value: f64, interpretation: impl Into<String>) -> Self {
        Self {
            statistic,
            p_value,
            interpretation: interpretation.into(),
        }
    }

    /// Zeroed result used when a kernel rejects its input.
    pub fn assumptions_violated() -> Self {
        Self::new(0.0, 1.0, "assumptions violated")
    }
}

/// Column data-quality bucket from the valid/total ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityFlag {
    Good,
    Moderate,
    Poor,
}

impl QualityFlag {
    /// `> 0.95` Good, `> 0.80` Moderate, else Poor.
    pub fn from_valid_ratio(ratio: f64) -> Self {
        if ratio > 0.95 {
            Self::Good
        } else if ratio > 0.80 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Poor => write!(f, "Poor"),
        }
    }
}

// ============================================================================
// Univariate reports
// ============================================================================

/// Finalized report for a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnReport {
    pub name: String,
    pub data_type: DataType,
    pub semantic_type: SemanticType,
    /// Type-detection confidence carried through from pass 1.
    pub detection_confidence: f64,
    pub total_count: u64,
    pub valid_count: u64,
    pub null_count: u64,
    pub null_percentage: f64,
    pub quality_flag: QualityFlag,
    pub details: ColumnDetails,
}

/// Per-type analysis payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "analyzer", rename_all = "camelCase")]
pub enum ColumnDetails {
    Numeric(NumericDetails),
    Categorical(CategoricalDetails),
    DateTime(DateTimeDetails),
    Boolean(BooleanDetails),
    Text(TextDetails),
    /// No valid values survived; nothing to report beyond the counts.
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericDetails {
    pub descriptives: Descriptives,
    pub quantiles: Quantiles,
    pub distribution: DistributionShape,
    pub normality: NormalityReport,
    pub outliers: OutlierReport,
    pub patterns: NumericPatterns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptives {
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub sum: f64,
    pub mean: f64,
    /// Streaming estimate from the 0.50 marker set.
    pub median: f64,
    /// Values sharing the highest observed frequency, ascending.
    pub modes: Vec<f64>,
    pub std_dev: f64,
    pub variance: f64,
    pub coefficient_of_variation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantiles {
    pub p1: f64,
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub iqr: f64,
    /// Median absolute deviation estimated from the retained sample.
    pub mad: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionShape {
    pub skewness: f64,
    pub kurtosis: f64,
    pub skewness_interpretation: String,
    pub kurtosis_interpretation: String,
    /// `min(10, ceil(sqrt(valid)))`
    pub histogram_bins: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalityReport {
    pub shapiro_wilk: TestResult,
    pub jarque_bera: TestResult,
    pub kolmogorov_smirnov: TestResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierReport {
    pub mild_lower_fence: f64,
    pub mild_upper_fence: f64,
    pub extreme_lower_fence: f64,
    pub extreme_upper_fence: f64,
    /// Counts over the retained sample, not the full stream.
    pub mild_outliers: usize,
    pub extreme_outliers: usize,
    pub zscore_outliers: usize,
    pub modified_zscore_outliers: usize,
    /// Distinct sample values flagged by any method.
    pub flagged_total: usize,
    pub evaluated_sample_size: usize,
    pub potential_impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericPatterns {
    pub zero_percentage: f64,
    pub negative_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_numbers_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_transform_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalDetails {
    /// Top categories by count (at most 20), with percentage and running
    /// cumulative percentage over the retained counts.
    pub frequencies: Vec<CategoryFrequency>,
    /// Distinct retained categories. A lower bound once eviction has run;
    /// see `unique_note`.
    pub unique_categories: usize,
    pub unique_percentage: f64,
    /// Present when the bounded counter evicted, marking the unique counts
    /// as approximate lower bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_note: Option<String>,
    pub entropy: f64,
    pub max_entropy: f64,
    pub gini_impurity: f64,
    pub dominance: String,
    pub label_length: LabelLengthStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_cardinality_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rare_category_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFrequency {
    pub value: String,
    pub count: u64,
    pub percentage: f64,
    pub cumulative_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelLengthStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeDetails {
    pub earliest: String,
    pub latest: String,
    pub span_days: f64,
    pub span_months: f64,
    pub span_years: f64,
    /// Second / Minute / Hour / Day
    pub granularity: String,
    pub top_years: Vec<CalendarBucket>,
    pub top_months: Vec<CalendarBucket>,
    pub top_weekdays: Vec<CalendarBucket>,
    pub top_hours: Vec<CalendarBucket>,
    pub temporal_pattern: String,
    pub largest_gap_days: f64,
    pub validity_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarBucket {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanDetails {
    pub true_count: u64,
    pub false_count: u64,
    pub true_percentage: f64,
    pub false_percentage: f64,
    pub interpretation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDetails {
    pub length_stats: TextLengthStats,
    pub word_stats: WordStats,
    pub empty_count: u64,
    pub numeric_count: u64,
    pub url_count: u64,
    pub email_count: u64,
    pub numeric_percentage: f64,
    pub url_percentage: f64,
    pub email_percentage: f64,
    pub top_words: Vec<WordFrequency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLengthStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// From the bounded word-count sample.
    pub median: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordFrequency {
    pub word: String,
    pub count: u64,
}

// ============================================================================
// Bivariate reports
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BivariateReport {
    pub numeric_numeric: NumericNumericReport,
    pub numeric_categorical: NumericCategoricalReport,
    pub categorical_categorical: CategoricalCategoricalReport,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericNumericReport {
    /// Top pairs by |r|, at most 50.
    pub pairs: Vec<CorrelationPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strongest_positive: Option<CorrelationPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strongest_negative: Option<CorrelationPair>,
    /// Pairs with |r| > 0.5.
    pub strong_correlations: Vec<CorrelationPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationPair {
    pub column_a: String,
    pub column_b: String,
    pub correlation: f64,
    pub sample_size: u64,
    pub significance: TestResult,
    /// Very Strong / Strong / Moderate / Weak / Very Weak by |r|.
    pub strength: String,
    /// Positive / Negative / None by sign.
    pub direction: String,
    pub scatter_insight: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericCategoricalReport {
    pub pairs: Vec<GroupComparison>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupComparison {
    pub numeric_column: String,
    pub categorical_column: String,
    pub groups: Vec<GroupStats>,
    pub anova: TestResult,
    pub kruskal_wallis: TestResult,
    pub summary: String,
    /// Documents the normal-approximation used for the group quartiles.
    pub quartile_note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub category: String,
    pub count: u64,
    pub mean: f64,
    /// Approximated by the group mean.
    pub median: f64,
    pub std_dev: f64,
    /// mean - 0.675 sigma
    pub q1: f64,
    /// mean + 0.675 sigma
    pub q3: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalCategoricalReport {
    pub pairs: Vec<Association>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub column_a: String,
    pub column_b: String,
    pub chi_square: TestResult,
    pub cramers_v: f64,
    pub cramers_v_strength: String,
    pub contingency_coefficient: f64,
    pub contingency_strength: String,
    pub top_combination: String,
}

// ============================================================================
// Composite report
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossVariableInsights {
    pub top_findings: Vec<String>,
    pub quality_issues: Vec<String>,
    pub hypotheses: Vec<String>,
    pub preprocessing_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub analysis_time_ms: u64,
    pub rows_analyzed: u64,
    pub chunks_processed: u64,
    #[serde(rename = "peakMemoryMB")]
    pub peak_memory_mb: f64,
    pub avg_chunk_size: f64,
    pub memory_efficiency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub analysis_approach: String,
    /// Total rows observed at the source (before any cap or sampling).
    pub dataset_size: u64,
    pub columns_analyzed: usize,
    pub sampling_applied: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdaAnalysis {
    pub univariate_analysis: Vec<ColumnReport>,
    pub bivariate_analysis: BivariateReport,
    pub cross_variable_insights: CrossVariableInsights,
}

/// Composite result of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdaReport {
    pub eda_analysis: EdaAnalysis,
    pub warnings: Vec<Warning>,
    pub performance_metrics: PerformanceMetrics,
    pub metadata: ReportMetadata,
}

// ============================================================================
// Rounding helpers
// ============================================================================

/// Round to `dp` decimal places. Report fields use 2 (percentages), 4
/// (statistics and moments) or 6 (p-values and correlations).
pub fn round_to(value: f64, dp: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}

pub fn round6(value: f64) -> f64 {
    round_to(value, 6)
}
