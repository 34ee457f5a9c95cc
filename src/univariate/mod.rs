//! Per-column streaming analyzers.
//!
//! One analyzer per header entry, selected from the pass-1 detection result.
//! Each consumes cells one at a time, keeps only bounded sketches, and emits
//! a finalized [`ColumnReport`] exactly once. The closed enum dispatch keeps
//! the variant set aligned with [`DataType`] without trait objects.

mod boolean;
mod categorical;
mod datetime;
mod numeric;
mod text;

pub use boolean::BooleanAnalyzer;
pub use categorical::CategoricalAnalyzer;
pub use datetime::DateTimeAnalyzer;
pub use numeric::NumericAnalyzer;
pub use text::TextAnalyzer;

use thiserror::Error;

use crate::types::{
    Cell, ColumnReport, DataType, QualityFlag, TypeDetectionResult, Warning, WarningSeverity,
};

/// Analyzer lifecycle errors.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("column '{0}' was already finalized")]
    AlreadyFinalized(String),
}

/// Reservoir seed shared by every deterministic univariate sketch.
pub const UNIVARIATE_SEED: u64 = 42;

/// Analyzer construction knobs lifted from the engine configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Cap on retained categorical levels (config `maxCategoricalLevels`).
    pub categorical_cap: usize,
    /// Enabled outlier detectors: "iqr", "zscore", "modified_zscore".
    pub outlier_methods: Vec<String>,
    /// Enabled normality tests: "shapiro_wilk", "jarque_bera",
    /// "kolmogorov_smirnov".
    pub normality_tests: Vec<String>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            categorical_cap: 500,
            outlier_methods: vec![
                "iqr".to_string(),
                "zscore".to_string(),
                "modified_zscore".to_string(),
            ],
            normality_tests: vec![
                "shapiro_wilk".to_string(),
                "jarque_bera".to_string(),
                "kolmogorov_smirnov".to_string(),
            ],
        }
    }
}

// ============================================================================
// Shared counts
// ============================================================================

/// Total/valid/null bookkeeping common to all analyzers.
///
/// Invariant: `valid + null == total` after every update; nulls never reach
/// the sketches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnCounts {
    pub total: u64,
    pub valid: u64,
    pub null: u64,
}

impl ColumnCounts {
    pub fn record_valid(&mut self) {
        self.total += 1;
        self.valid += 1;
    }

    pub fn record_null(&mut self) {
        self.total += 1;
        self.null += 1;
    }

    pub fn valid_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }

    pub fn null_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.null as f64 / self.total as f64
        }
    }

    pub fn quality_flag(&self) -> QualityFlag {
        QualityFlag::from_valid_ratio(self.valid_ratio())
    }

    /// Standard finalize-time warnings shared by every analyzer.
    pub(crate) fn standard_warnings(&self, column: &str, mismatches: u64) -> Vec<Warning> {
        let mut warnings = Vec::new();
        if self.valid == 0 {
            warnings.push(
                Warning::data(
                    WarningSeverity::High,
                    format!("column '{column}' has no valid values"),
                )
                .with_impact("no statistics could be computed"),
            );
        } else if self.null_ratio() > 0.2 {
            warnings.push(
                Warning::data(
                    WarningSeverity::Medium,
                    format!(
                        "column '{column}' is {:.1}% null",
                        self.null_ratio() * 100.0
                    ),
                )
                .with_suggestion("review upstream extraction or impute before modeling"),
            );
        }
        if mismatches > 0 {
            warnings.push(Warning::data(
                WarningSeverity::Low,
                format!(
                    "column '{column}': {mismatches} values did not match the detected type and were counted as null"
                ),
            ));
        }
        warnings
    }
}

// ============================================================================
// Closed analyzer dispatch
// ============================================================================

/// One streaming analyzer, variant-selected from the detection result.
#[derive(Debug)]
pub enum ColumnAnalyzer {
    Numeric(NumericAnalyzer),
    Categorical(CategoricalAnalyzer),
    DateTime(DateTimeAnalyzer),
    Boolean(BooleanAnalyzer),
    Text(TextAnalyzer),
}

impl ColumnAnalyzer {
    /// Allocate the analyzer matching a pass-1 detection result.
    pub fn for_detection(
        name: &str,
        detection: &TypeDetectionResult,
        options: &AnalyzerOptions,
    ) -> Self {
        match detection.data_type {
            DataType::NumericalInteger | DataType::NumericalFloat => {
                Self::Numeric(NumericAnalyzer::new(name, detection.clone(), options))
            }
            DataType::Categorical => Self::Categorical(CategoricalAnalyzer::new(
                name,
                detection.clone(),
                options.categorical_cap,
            )),
            DataType::DateTime => Self::DateTime(DateTimeAnalyzer::new(name, detection.clone())),
            DataType::Boolean => Self::Boolean(BooleanAnalyzer::new(name, detection.clone())),
            DataType::TextGeneral | DataType::TextAddress => {
                Self::Text(TextAnalyzer::new(name, detection.clone()))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Numeric(a) => a.name(),
            Self::Categorical(a) => a.name(),
            Self::DateTime(a) => a.name(),
            Self::Boolean(a) => a.name(),
            Self::Text(a) => a.name(),
        }
    }

    /// Feed one cell. Null cells only move the counts.
    pub fn process_value(&mut self, cell: &Cell) {
        match self {
            Self::Numeric(a) => a.process_value(cell),
            Self::Categorical(a) => a.process_value(cell),
            Self::DateTime(a) => a.process_value(cell),
            Self::Boolean(a) => a.process_value(cell),
            Self::Text(a) => a.process_value(cell),
        }
    }

    /// Emit the column report. A second call is a lifecycle error.
    pub fn finalize(&mut self) -> Result<ColumnReport, AnalyzerError> {
        match self {
            Self::Numeric(a) => a.finalize(),
            Self::Categorical(a) => a.finalize(),
            Self::DateTime(a) => a.finalize(),
            Self::Boolean(a) => a.finalize(),
            Self::Text(a) => a.finalize(),
        }
    }

    /// Warnings accumulated so far (complete after finalize).
    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::Numeric(a) => a.warnings(),
            Self::Categorical(a) => a.warnings(),
            Self::DateTime(a) => a.warnings(),
            Self::Boolean(a) => a.warnings(),
            Self::Text(a) => a.warnings(),
        }
    }

    /// Release scratch allocations under memory pressure. Sketch contents
    /// needed for finalize are never dropped.
    pub fn clear_transient_memory(&mut self) {
        match self {
            Self::Numeric(a) => a.clear_transient_memory(),
            Self::Categorical(a) => a.clear_transient_memory(),
            Self::DateTime(a) => a.clear_transient_memory(),
            Self::Boolean(a) => a.clear_transient_memory(),
            Self::Text(a) => a.clear_transient_memory(),
        }
    }

    /// Retained-bytes estimate for the memory budget.
    pub fn estimated_bytes(&self) -> usize {
        match self {
            Self::Numeric(a) => a.estimated_bytes(),
            Self::Categorical(a) => a.estimated_bytes(),
            Self::DateTime(a) => a.estimated_bytes(),
            Self::Boolean(a) => a.estimated_bytes(),
            Self::Text(a) => a.estimated_bytes(),
        }
    }
}
