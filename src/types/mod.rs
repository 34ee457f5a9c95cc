//! Shared data model: cells and rows, type taxonomy, warnings, and the
//! report tree.

mod cell;
mod detection;
mod report;
mod warning;

pub use cell::{Cell, DataType, ParsedRow, SemanticType};
pub use detection::TypeDetectionResult;
pub use report::{
    round2, round4, round6, round_to, Association, BivariateReport, BooleanDetails,
    CalendarBucket, CategoricalCategoricalReport, CategoricalDetails, CategoryFrequency,
    ColumnDetails, ColumnReport, CorrelationPair, CrossVariableInsights, DateTimeDetails,
    Descriptives, DistributionShape, EdaAnalysis, EdaReport, GroupComparison, GroupStats,
    LabelLengthStats, NormalityReport, NumericCategoricalReport, NumericDetails,
    NumericNumericReport, NumericPatterns, OutlierReport, PerformanceMetrics, Quantiles,
    QualityFlag, ReportMetadata, TestResult, TextDetails, TextLengthStats, WordFrequency,
    WordStats,
};
pub use warning::{Warning, WarningCategory, WarningSeverity};
