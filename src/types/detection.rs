//! Type-detection result carried from pass 1 into analyzer allocation.

use serde::{Deserialize, Serialize};

use super::{DataType, SemanticType};

/// Per-column outcome of the detection battery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDetectionResult {
    pub data_type: DataType,
    pub semantic_type: SemanticType,
    /// In [0, 1]; already penalized for poor data quality.
    pub confidence: f64,
    /// Ordered trace of the tests that fired, for the report reader.
    pub reasons: Vec<String>,
}

impl TypeDetectionResult {
    pub fn new(data_type: DataType, semantic_type: SemanticType, confidence: f64) -> Self {
        Self {
            data_type,
            semantic_type,
            confidence,
            reasons: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}
