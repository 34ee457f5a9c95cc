//! Categorical column analyzer: bounded frequency distribution, entropy,
//! dominance, and label-length statistics.

use crate::stats::{BoundedFrequencyCounter, MomentAccumulator};
use crate::types::{
    round2, round4, CategoricalDetails, CategoryFrequency, Cell, ColumnDetails, ColumnReport,
    LabelLengthStats, TypeDetectionResult, Warning, WarningSeverity,
};

use super::{AnalyzerError, ColumnCounts};

/// Report at most this many categories in the frequency table.
const TOP_CATEGORIES: usize = 20;

#[derive(Debug)]
pub struct CategoricalAnalyzer {
    name: String,
    detection: TypeDetectionResult,
    counts: ColumnCounts,
    categories: BoundedFrequencyCounter<String>,
    label_lengths: MomentAccumulator,
    warnings: Vec<Warning>,
    finalized: bool,
}

impl CategoricalAnalyzer {
    /// `cap` is the configured `max_categorical_levels` (default 500).
    pub fn new(name: &str, detection: TypeDetectionResult, cap: usize) -> Self {
        Self {
            name: name.to_string(),
            detection,
            counts: ColumnCounts::default(),
            categories: BoundedFrequencyCounter::new(cap),
            label_lengths: MomentAccumulator::new(),
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
        let Some(key) = cell.to_key() else {
            self.counts.record_null();
            return;
        };
        self.counts.record_valid();
        self.label_lengths.update(key.chars().count() as f64);
        self.categories.update(key);
    }

    pub fn finalize(&mut self) -> Result<ColumnReport, AnalyzerError> {
        if self.finalized {
            return Err(AnalyzerError::AlreadyFinalized(self.name.clone()));
        }
        self.finalized = true;
        self.warnings.extend(self.counts.standard_warnings(&self.name, 0));

        let details = if self.counts.valid == 0 {
            ColumnDetails::Empty
        } else {
            ColumnDetails::Categorical(self.build_details())
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

    fn build_details(&mut self) -> CategoricalDetails {
        let valid = self.counts.valid as f64;
        let unique = self.categories.len();
        let evicted = self.categories.has_evicted();

        // Percentages are quoted against the full valid count, which the
        // counter can undercount after eviction; the note flags that.
        let mut cumulative = 0.0;
        let frequencies: Vec<CategoryFrequency> = self
            .categories
            .top_k(TOP_CATEGORIES)
            .into_iter()
            .map(|(value, count)| {
                let percentage = count as f64 * 100.0 / valid;
                cumulative += percentage;
                CategoryFrequency {
                    value,
                    count,
                    percentage: round2(percentage),
                    cumulative_percentage: round2(cumulative),
                }
            })
            .collect();

        // Shannon entropy over the retained distribution.
        let retained_total = self.categories.total_count() as f64;
        let mut entropy = 0.0;
        let mut gini_sum = 0.0;
        for (_, count) in self.categories.iter() {
            let p = count as f64 / retained_total;
            if p > 0.0 {
                entropy -= p * p.log2();
            }
            gini_sum += p * p;
        }
        let max_entropy = if unique > 0 { (unique as f64).log2() } else { 0.0 };

        let dominance = frequencies.first().map_or_else(
            || "no categories".to_string(),
            |top| {
                let pct = top.percentage;
                if pct > 80.0 {
                    format!("highly dominated by '{}' ({pct:.1}%)", top.value)
                } else if pct > 60.0 {
                    format!("dominated by '{}' ({pct:.1}%)", top.value)
                } else if pct > 40.0 {
                    format!("moderately concentrated on '{}' ({pct:.1}%)", top.value)
                } else {
                    "balanced across categories".to_string()
                }
            },
        );

        let rare_count = self
            .categories
            .iter()
            .filter(|(_, count)| (*count as f64) * 100.0 / valid < 1.0)
            .count();
        let rare_category_note = if unique > 0 && rare_count * 2 > unique {
            Some(format!(
                "{rare_count} of {unique} categories each cover less than 1% of rows"
            ))
        } else {
            None
        };

        let high_cardinality_warning = if unique > 100 {
            let message = format!(
                "column '{}' has {unique}{} distinct categories",
                self.name,
                if evicted { "+" } else { "" }
            );
            self.warnings.push(
                Warning::data(WarningSeverity::Medium, message.clone())
                    .with_suggestion("consider hashing or grouping before one-hot encoding"),
            );
            Some(message)
        } else {
            None
        };

        let unique_note = evicted.then(|| {
            "category counter evicted low-frequency labels; unique counts and percentages are lower bounds".to_string()
        });

        CategoricalDetails {
            frequencies,
            unique_categories: unique,
            unique_percentage: round2(unique as f64 * 100.0 / valid),
            unique_note,
            entropy: round4(entropy),
            max_entropy: round4(max_entropy),
            gini_impurity: round4(1.0 - gini_sum),
            dominance,
            label_length: LabelLengthStats {
                min: round2(self.label_lengths.min()),
                max: round2(self.label_lengths.max()),
                mean: round2(self.label_lengths.mean()),
                std_dev: round2(self.label_lengths.sample_variance().sqrt()),
            },
            high_cardinality_warning,
            rare_category_note,
        }
    }

    pub fn clear_transient_memory(&mut self) {
        self.warnings.shrink_to_fit();
    }

    pub fn estimated_bytes(&self) -> usize {
        self.categories.estimated_bytes(String::len)
            + self.label_lengths.estimated_bytes()
            + std::mem::size_of::<Self>()
    }
}
