//! Boolean column analyzer over the canonical truthy/falsy token sets.

use crate::types::{
    round2, round4, BooleanDetails, Cell, ColumnDetails, ColumnReport, TypeDetectionResult,
    Warning,
};

use super::{AnalyzerError, ColumnCounts};

const TRUTHY: &[&str] = &["true", "yes", "y", "1", "on", "enabled", "active"];
const FALSY: &[&str] = &["false", "no", "n", "0", "off", "disabled", "inactive"];

#[derive(Debug)]
pub struct BooleanAnalyzer {
    name: String,
    detection: TypeDetectionResult,
    counts: ColumnCounts,
    true_count: u64,
    false_count: u64,
    mismatches: u64,
    warnings: Vec<Warning>,
    finalized: bool,
}

impl BooleanAnalyzer {
    pub fn new(name: &str, detection: TypeDetectionResult) -> Self {
        Self {
            name: name.to_string(),
            detection,
            counts: ColumnCounts::default(),
            true_count: 0,
            false_count: 0,
            mismatches: 0,
            warnings: Vec::new(),
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn process_value(&mut self, cell: &Cell) {
        if self.finalized {
            return;
        }
        let Some(raw) = cell.to_key() else {
            self.counts.record_null();
            return;
        };
        let token = raw.to_lowercase();
        if TRUTHY.contains(&token.as_str()) {
            self.counts.record_valid();
            self.true_count += 1;
        } else if FALSY.contains(&token.as_str()) {
            self.counts.record_valid();
            self.false_count += 1;
        } else {
            self.counts.record_null();
            self.mismatches += 1;
        }
    }

    pub fn finalize(&mut self) -> Result<ColumnReport, AnalyzerError> {
        if self.finalized {
            return Err(AnalyzerError::AlreadyFinalized(self.name.clone()));
        }
        self.finalized = true;
        self.warnings
            .extend(self.counts.standard_warnings(&self.name, self.mismatches));

        let details = if self.counts.valid == 0 {
            ColumnDetails::Empty
        } else {
            let valid = self.counts.valid as f64;
            let true_pct = self.true_count as f64 * 100.0 / valid;
            let false_pct = self.false_count as f64 * 100.0 / valid;
            let interpretation = if true_pct > 75.0 {
                format!("predominantly true ({true_pct:.1}%)")
            } else if false_pct > 75.0 {
                format!("predominantly false ({false_pct:.1}%)")
            } else {
                format!("balanced ({true_pct:.1}% true, {false_pct:.1}% false)")
            };
            ColumnDetails::Boolean(BooleanDetails {
                true_count: self.true_count,
                false_count: self.false_count,
                true_percentage: round2(true_pct),
                false_percentage: round2(false_pct),
                interpretation,
            })
        };

        Ok(ColumnReport {
            name: self.name.clone(),
            data_type: self.detection.data_type,
            semantic_type: self.detection.semantic_type,
            detection_confidence: round4(self.detection.confidence),
            total_count: self.counts.total,
            valid_count: self.counts.valid,
            null_count: self.counts.null,
            null_percentage: round2(self.counts.null_ratio() * 100.0),
            quality_flag: self.counts.quality_flag(),
            details,
        })
    }

    pub fn clear_transient_memory(&mut self) {
        self.warnings.shrink_to_fit();
    }

    pub fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, SemanticType};

    fn analyzer() -> BooleanAnalyzer {
        BooleanAnalyzer::new(
            "active",
            TypeDetectionResult::new(DataType::Boolean, SemanticType::Status, 0.95),
        )
    }

    fn details(report: &ColumnReport) -> &BooleanDetails {
        match &report.details {
            ColumnDetails::Boolean(d) => d,
            other => panic!("expected boolean details, got {other:?}"),
        }
    }

    #[test]
    fn counts_all_canonical_token_sets() {
        let mut a = analyzer();
        for v in ["yes", "TRUE", "on", "1", "Enabled", "no", "0", "off"] {
            a.process_value(&Cell::Text(v.to_string()));
        }
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert_eq!(d.true_count, 5);
        assert_eq!(d.false_count, 3);
    }

    #[test]
    fn predominance_buckets() {
        let mut a = analyzer();
        for _ in 0..9 {
            a.process_value(&Cell::Text("yes".to_string()));
        }
        a.process_value(&Cell::Text("no".to_string()));
        let report = a.finalize().unwrap();
        assert!(details(&report).interpretation.starts_with("predominantly true"));
    }

    #[test]
    fn balanced_when_neither_dominates() {
        let mut a = analyzer();
        for v in ["yes", "no", "yes", "no"] {
            a.process_value(&Cell::Text(v.to_string()));
        }
        let report = a.finalize().unwrap();
        assert!(details(&report).interpretation.starts_with("balanced"));
    }

    #[test]
    fn unknown_tokens_count_as_null_mismatches() {
        let mut a = analyzer();
        a.process_value(&Cell::Text("yes".to_string()));
        a.process_value(&Cell::Text("maybe".to_string()));
        let report = a.finalize().unwrap();
        assert_eq!(report.valid_count, 1);
        assert_eq!(report.null_count, 1);
    }
}
