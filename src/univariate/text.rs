//! Free-text column analyzer: length and word statistics, pattern counts,
//! and a bounded top-words table.

use regex::Regex;

use crate::stats::{exact_quantile, BoundedFrequencyCounter, MomentAccumulator, Reservoir};
use crate::types::{
    round2, round4, Cell, ColumnDetails, ColumnReport, TextDetails, TextLengthStats,
    TypeDetectionResult, Warning, WordFrequency, WordStats,
};

use super::{AnalyzerError, ColumnCounts, UNIVARIATE_SEED};

const LENGTH_SAMPLE_CAP: usize = 100;
const WORD_COUNTER_CAP: usize = 50;
/// Strings at or above this length skip tokenization entirely.
const TOKENIZE_MAX_LEN: usize = 500;
/// Tokens must be longer than this to be counted.
const MIN_TOKEN_LEN: usize = 2;
const TOP_WORDS: usize = 5;

#[derive(Debug)]
pub struct TextAnalyzer {
    name: String,
    detection: TypeDetectionResult,
    counts: ColumnCounts,
    char_lengths: MomentAccumulator,
    length_sample: Reservoir<f64>,
    word_counts: MomentAccumulator,
    word_sample: Reservoir<f64>,
    words: BoundedFrequencyCounter<String>,
    empty_count: u64,
    numeric_count: u64,
    url_count: u64,
    email_count: u64,
    numeric_re: Regex,
    url_re: Regex,
    email_re: Regex,
    token_re: Regex,
    warnings: Vec<Warning>,
    finalized: bool,
}

impl TextAnalyzer {
    // Pattern literals are compile-time constants; failure is a build bug.
    #[allow(clippy::unwrap_used)]
    pub fn new(name: &str, detection: TypeDetectionResult) -> Self {
        Self {
            name: name.to_string(),
            detection,
            counts: ColumnCounts::default(),
            char_lengths: MomentAccumulator::new(),
            length_sample: Reservoir::with_seed(LENGTH_SAMPLE_CAP, UNIVARIATE_SEED),
            word_counts: MomentAccumulator::new(),
            word_sample: Reservoir::with_seed(LENGTH_SAMPLE_CAP, UNIVARIATE_SEED),
            words: BoundedFrequencyCounter::new(WORD_COUNTER_CAP),
            empty_count: 0,
            numeric_count: 0,
            url_count: 0,
            email_count: 0,
            numeric_re: Regex::new(r"^-?\d*\.?\d+$").unwrap(),
            url_re: Regex::new(r"^https?://\S+$").unwrap(),
            email_re: Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap(),
            token_re: Regex::new(r"\W+").unwrap(),
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
        let Some(text) = cell.to_key() else {
            self.counts.record_null();
            return;
        };
        self.counts.record_valid();

        let char_len = text.chars().count();
        self.char_lengths.update(char_len as f64);
        self.length_sample.update(char_len as f64);

        let word_count = text.split_whitespace().count();
        self.word_counts.update(word_count as f64);
        self.word_sample.update(word_count as f64);

        if text.is_empty() {
            self.empty_count += 1;
        }
        if self.numeric_re.is_match(&text) {
            self.numeric_count += 1;
        }
        if self.url_re.is_match(&text) {
            self.url_count += 1;
        }
        if self.email_re.is_match(&text) {
            self.email_count += 1;
        }

        if char_len < TOKENIZE_MAX_LEN {
            let lowered = text.to_lowercase();
            for token in self.token_re.split(&lowered) {
                if token.len() > MIN_TOKEN_LEN {
                    self.words.update(token.to_string());
                }
            }
        }
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
            ColumnDetails::Text(self.build_details())
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

    fn build_details(&self) -> TextDetails {
        let valid = self.counts.valid.max(1) as f64;

        let mut sorted_lengths: Vec<f64> = self.length_sample.sample().to_vec();
        sorted_lengths.sort_by(|a, b| a.total_cmp(b));
        let mut sorted_words: Vec<f64> = self.word_sample.sample().to_vec();
        sorted_words.sort_by(|a, b| a.total_cmp(b));

        TextDetails {
            length_stats: TextLengthStats {
                min: round2(self.char_lengths.min()),
                max: round2(self.char_lengths.max()),
                mean: round2(self.char_lengths.mean()),
                median: round2(exact_quantile(&sorted_lengths, 0.5)),
                std_dev: round2(self.char_lengths.sample_variance().sqrt()),
            },
            word_stats: WordStats {
                min: round2(self.word_counts.min()),
                max: round2(self.word_counts.max()),
                mean: round2(self.word_counts.mean()),
                median: round2(exact_quantile(&sorted_words, 0.5)),
            },
            empty_count: self.empty_count,
            numeric_count: self.numeric_count,
            url_count: self.url_count,
            email_count: self.email_count,
            numeric_percentage: round2(self.numeric_count as f64 * 100.0 / valid),
            url_percentage: round2(self.url_count as f64 * 100.0 / valid),
            email_percentage: round2(self.email_count as f64 * 100.0 / valid),
            top_words: self
                .words
                .top_k(TOP_WORDS)
                .into_iter()
                .map(|(word, count)| WordFrequency { word, count })
                .collect(),
        }
    }

    pub fn clear_transient_memory(&mut self) {
        self.warnings.shrink_to_fit();
    }

    pub fn estimated_bytes(&self) -> usize {
        self.length_sample.estimated_bytes()
            + self.word_sample.estimated_bytes()
            + self.words.estimated_bytes(String::len)
            + std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, SemanticType};

    fn analyzer() -> TextAnalyzer {
        TextAnalyzer::new(
            "notes",
            TypeDetectionResult::new(DataType::TextGeneral, SemanticType::Unknown, 0.3),
        )
    }

    fn details(report: &ColumnReport) -> &TextDetails {
        match &report.details {
            ColumnDetails::Text(d) => d,
            other => panic!("expected text details, got {other:?}"),
        }
    }

    fn feed(a: &mut TextAnalyzer, values: &[&str]) {
        for v in values {
            a.process_value(&Cell::Text((*v).to_string()));
        }
    }

    #[test]
    fn length_and_word_stats() {
        let mut a = analyzer();
        feed(&mut a, &["one two three", "four five", "six"]);
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert_eq!(d.length_stats.min, 3.0);
        assert_eq!(d.length_stats.max, 13.0);
        assert_eq!(d.word_stats.max, 3.0);
        assert_eq!(d.word_stats.min, 1.0);
        assert!((d.word_stats.mean - 2.0).abs() < 1e-9);
    }

    #[test]
    fn pattern_counts_detect_urls_emails_numbers() {
        let mut a = analyzer();
        feed(
            &mut a,
            &[
                "https://example.com/page",
                "user@example.com",
                "12345",
                "plain words here",
            ],
        );
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert_eq!(d.url_count, 1);
        assert_eq!(d.email_count, 1);
        assert_eq!(d.numeric_count, 1);
        assert_eq!(d.url_percentage, 25.0);
    }

    #[test]
    fn top_words_skip_short_tokens_and_lowercase() {
        let mut a = analyzer();
        feed(
            &mut a,
            &[
                "The Quick Brown Fox",
                "the quick brown fox again",
                "a an of to it is",
            ],
        );
        let report = a.finalize().unwrap();
        let d = details(&report);
        let words: Vec<&str> = d.top_words.iter().map(|w| w.word.as_str()).collect();
        assert!(words.contains(&"quick"));
        assert!(words.contains(&"the"));
        assert!(!words.iter().any(|w| w.len() <= 2));
        let quick = d.top_words.iter().find(|w| w.word == "quick").unwrap();
        assert_eq!(quick.count, 2);
    }

    #[test]
    fn oversized_strings_skip_tokenization() {
        let mut a = analyzer();
        let huge = "word ".repeat(200); // 1000 chars
        a.process_value(&Cell::Text(huge));
        a.process_value(&Cell::Text("short words".to_string()));
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert!(!d.top_words.iter().any(|w| w.word == "word"));
        assert!(d.top_words.iter().any(|w| w.word == "short"));
    }
}
