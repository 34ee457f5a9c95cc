//! Warning model shared by every stage of the pipeline.
//!
//! Anything local to a single cell, row, column, or pair is absorbed into a
//! warning and never propagates to the caller. Only `NoData` and fatal
//! orchestrator-level errors surface as hard errors.

use serde::{Deserialize, Serialize};

/// Which subsystem a warning concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningCategory {
    Performance,
    Data,
    Error,
}

/// How loudly the warning should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for WarningSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// A non-fatal finding recorded during analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub category: WarningCategory,
    pub severity: WarningSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Warning {
    pub fn new(
        category: WarningCategory,
        severity: WarningSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            impact: None,
            suggestion: None,
        }
    }

    /// Data-quality warning (missing values, parse mismatches, cardinality).
    pub fn data(severity: WarningSeverity, message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Data, severity, message)
    }

    /// Performance warning (memory pressure, sampling, truncation).
    pub fn performance(severity: WarningSeverity, message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Performance, severity, message)
    }

    /// Error-category warning (kernel failures, degraded results).
    pub fn error(severity: WarningSeverity, message: impl Into<String>) -> Self {
        Self::new(WarningCategory::Error, severity, message)
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}
