//! Sample-based column type detection.
//!
//! Pass 1 hands each column a bounded sample of raw values; the detector
//! runs a fixed-order battery of pattern tests, keeps the highest-confidence
//! hit, and applies a data-quality penalty before reporting. Confidence
//! formulae are the tie-breaker for ambiguous columns: a 1/0 column under a
//! numeric-hinted name reaches 0.98 on the numeric test and reports as an
//! integer; without the hint the boolean test's 0.97 outranks it.

mod dates;
mod semantic;

pub use dates::{parse_datetime, parse_datetime_lenient, MAX_YEAR, MIN_YEAR};
pub use semantic::classify_semantic;

use regex::Regex;

use crate::types::{Cell, DataType, SemanticType, TypeDetectionResult};

// ============================================================================
// Name hint sets
// ============================================================================

/// Column-name tokens that relax the numeric trigger ratio to 0.7.
const NUMERIC_NAME_HINTS: &[&str] = &[
    "id", "count", "number", "quantity", "amount", "size", "length", "age", "rate", "pressure",
    "sugar", "weight", "height", "score", "price", "salary", "value", "level", "measurement",
];

const CURRENCY_NAME_HINTS: &[&str] =
    &["price", "cost", "amount", "salary", "revenue", "fee", "charge"];

const PERCENTAGE_NAME_HINTS: &[&str] = &["percent", "rate", "ratio", "%"];

const DATE_NAME_HINTS: &[&str] = &[
    "date", "time", "timestamp", "created", "updated", "modified", "birth", "expir",
];

/// Names that are never dates, however date-like their values look.
const DATE_NAME_REJECTS: &[&str] = &["gender", "sex", "type", "category", "status", "class", "group"];

const GENDER_TOKENS: &[&str] = &["male", "female", "m", "f", "other", "non-binary", "nonbinary"];

/// Canonical truthy/falsy token pairs.
const BOOLEAN_PAIRS: &[(&str, &str)] = &[
    ("true", "false"),
    ("yes", "no"),
    ("y", "n"),
    ("1", "0"),
    ("on", "off"),
    ("enabled", "disabled"),
    ("active", "inactive"),
];

fn name_has_hint(name: &str, hints: &[&str]) -> bool {
    hints.iter().any(|h| name.contains(h))
}

// ============================================================================
// Detector
// ============================================================================

/// Compiled pattern battery; build once, reuse across columns.
pub struct TypeDetector {
    numeric: Regex,
    currency: [Regex; 3],
    percentage: Regex,
    email: Regex,
    url: Regex,
}

impl Default for TypeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDetector {
    // Patterns are compile-time constants; a failure here is a build bug.
    #[allow(clippy::unwrap_used)]
    pub fn new() -> Self {
        Self {
            numeric: Regex::new(r"^-?\d*\.?\d+$").unwrap(),
            currency: [
                Regex::new(r"^\$[\d,]+\.?\d*$").unwrap(),
                Regex::new(r"(?i)^[\d,]+\.?\d*\s*(USD|EUR|GBP|CAD|AUD)$").unwrap(),
                Regex::new(r"(?i)^(USD|EUR|GBP|CAD|AUD)\s*[\d,]+\.?\d*$").unwrap(),
            ],
            percentage: Regex::new(r"^[\d.]+%$").unwrap(),
            email: Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap(),
            url: Regex::new(r"^https?://\S+$").unwrap(),
        }
    }

    /// Run the battery over a column sample and report the winning type.
    pub fn detect(&self, name: &str, cells: &[Cell]) -> TypeDetectionResult {
        let total = cells.len();
        let values: Vec<String> = cells.iter().filter_map(Cell::to_key).collect();

        if values.is_empty() {
            return TypeDetectionResult::new(DataType::TextGeneral, SemanticType::Unknown, 0.0)
                .with_reason("no valid values in sample");
        }

        let quality_ratio = if total == 0 {
            0.0
        } else {
            values.len() as f64 / total as f64
        };
        let lower_name = name.to_lowercase();

        // Fixed-order battery; the highest-confidence triggered test wins.
        let candidates = [
            self.test_numeric(&lower_name, &values),
            self.test_boolean(&values),
            self.test_currency(&lower_name, &values),
            self.test_percentage(&lower_name, &values),
            self.test_email(&values),
            self.test_url(&values),
            self.test_datetime(&lower_name, &values),
            self.test_categorical(&lower_name, &values),
        ];

        let mut best = candidates
            .into_iter()
            .flatten()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .unwrap_or_else(|| self.fallback_text(&values));

        // Data-quality penalty: up to 0.15 for a column that is mostly null.
        let penalty = 0.15 * (1.0 - quality_ratio);
        if penalty > 0.0 {
            best.confidence = (best.confidence - penalty).max(0.0);
            best.reasons
                .push(format!("confidence penalized {penalty:.3} for null ratio"));
        }

        if best.semantic_type == SemanticType::Unknown
            || best.semantic_type == SemanticType::Category
        {
            let refined = classify_semantic(name, best.data_type);
            if refined != SemanticType::Unknown {
                best.semantic_type = refined;
            }
        }
        best
    }

    // ------------------------------------------------------------------
    // Battery tests
    // ------------------------------------------------------------------

    fn test_numeric(&self, name: &str, values: &[String]) -> Option<TypeDetectionResult> {
        let matches: Vec<&String> = values
            .iter()
            .filter(|v| self.numeric.is_match(v))
            .collect();
        let theta = matches.len() as f64 / values.len() as f64;
        let hinted = name_has_hint(name, NUMERIC_NAME_HINTS);
        let threshold = if hinted { 0.7 } else { 0.85 };
        if theta < threshold {
            return None;
        }

        let integer_like = matches
            .iter()
            .filter(|v| !v.contains('.') && v.parse::<i64>().is_ok())
            .count();
        let no_decimal_points = matches.iter().all(|v| !v.contains('.'));
        let data_type = if matches.is_empty() {
            DataType::NumericalFloat
        } else if integer_like as f64 >= 0.9 * matches.len() as f64 && no_decimal_points {
            DataType::NumericalInteger
        } else {
            DataType::NumericalFloat
        };

        let mut confidence = 0.5 + 0.35 * theta;
        if hinted {
            confidence += 0.15;
        }
        if theta >= 0.95 {
            confidence += 0.10;
        }
        if theta < 0.80 {
            confidence -= 0.10;
        }
        let confidence = confidence.min(0.98);

        Some(
            TypeDetectionResult::new(data_type, SemanticType::Unknown, confidence).with_reason(
                format!("numeric pattern matched {:.1}% of sample", theta * 100.0),
            ),
        )
    }

    fn test_boolean(&self, values: &[String]) -> Option<TypeDetectionResult> {
        let lowered: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
        let mut unique: Vec<&str> = Vec::new();
        for v in &lowered {
            if !unique.contains(&v.as_str()) {
                unique.push(v);
            }
        }
        if unique.len() > 3 {
            return None;
        }

        let all_tokens: Vec<&str> = BOOLEAN_PAIRS
            .iter()
            .flat_map(|(t, f)| [*t, *f])
            .collect();
        let matched = lowered
            .iter()
            .filter(|v| all_tokens.contains(&v.as_str()))
            .count();
        let ratio = matched as f64 / values.len() as f64;
        if ratio < 0.9 {
            return None;
        }

        let exact_pair = BOOLEAN_PAIRS.iter().any(|(t, f)| {
            unique.len() == 2 && unique.contains(t) && unique.contains(f)
        });
        let mut confidence = 0.7 + 0.25 * ratio;
        if exact_pair {
            confidence += 0.05;
        }
        let confidence = confidence.min(0.97);

        Some(
            TypeDetectionResult::new(DataType::Boolean, SemanticType::Status, confidence)
                .with_reason(format!("boolean tokens matched {:.1}% of sample", ratio * 100.0)),
        )
    }

    fn test_currency(&self, name: &str, values: &[String]) -> Option<TypeDetectionResult> {
        let matched = values
            .iter()
            .filter(|v| self.currency.iter().any(|re| re.is_match(v)))
            .count();
        let ratio = matched as f64 / values.len() as f64;
        if ratio < 0.7 {
            return None;
        }
        let mut confidence = 0.6 + 0.3 * ratio;
        if name_has_hint(name, CURRENCY_NAME_HINTS) {
            confidence += 0.05;
        }
        Some(
            TypeDetectionResult::new(
                DataType::NumericalFloat,
                SemanticType::Currency,
                confidence.min(0.95),
            )
            .with_reason(format!("currency pattern matched {:.1}% of sample", ratio * 100.0)),
        )
    }

    fn test_percentage(&self, name: &str, values: &[String]) -> Option<TypeDetectionResult> {
        let matched = values.iter().filter(|v| self.percentage.is_match(v)).count();
        let ratio = matched as f64 / values.len() as f64;
        if ratio < 0.8 {
            return None;
        }
        let mut confidence = 0.6 + 0.3 * ratio;
        if name_has_hint(name, PERCENTAGE_NAME_HINTS) {
            confidence += 0.05;
        }
        Some(
            TypeDetectionResult::new(
                DataType::NumericalFloat,
                SemanticType::Percentage,
                confidence.min(0.95),
            )
            .with_reason(format!("percentage pattern matched {:.1}% of sample", ratio * 100.0)),
        )
    }

    fn test_email(&self, values: &[String]) -> Option<TypeDetectionResult> {
        let matched = values.iter().filter(|v| self.email.is_match(v)).count();
        let ratio = matched as f64 / values.len() as f64;
        if ratio < 0.9 {
            return None;
        }
        Some(
            TypeDetectionResult::new(
                DataType::TextAddress,
                SemanticType::Identifier,
                (0.7 + 0.25 * ratio).min(0.97),
            )
            .with_reason(format!("email pattern matched {:.1}% of sample", ratio * 100.0)),
        )
    }

    fn test_url(&self, values: &[String]) -> Option<TypeDetectionResult> {
        let matched = values.iter().filter(|v| self.url.is_match(v)).count();
        let ratio = matched as f64 / values.len() as f64;
        if ratio < 0.8 {
            return None;
        }
        Some(
            TypeDetectionResult::new(
                DataType::TextAddress,
                SemanticType::Identifier,
                (0.7 + 0.25 * ratio).min(0.95),
            )
            .with_reason(format!("url pattern matched {:.1}% of sample", ratio * 100.0)),
        )
    }

    fn test_datetime(&self, name: &str, values: &[String]) -> Option<TypeDetectionResult> {
        if name_has_hint(name, DATE_NAME_REJECTS) {
            return None;
        }
        let date_hinted = name_has_hint(name, DATE_NAME_HINTS);
        // Numeric-named columns are only dates when the name also says so.
        if name_has_hint(name, NUMERIC_NAME_HINTS) && !date_hinted {
            return None;
        }

        let matched = values
            .iter()
            .filter(|v| parse_datetime(v).is_some())
            .count();
        let ratio = matched as f64 / values.len() as f64;
        let threshold = if date_hinted { 0.7 } else { 0.9 };
        if ratio < threshold {
            return None;
        }

        let mut confidence = 0.6 + 0.3 * ratio;
        if date_hinted {
            confidence += 0.08;
        }
        Some(
            TypeDetectionResult::new(
                DataType::DateTime,
                SemanticType::Unknown,
                confidence.min(0.95),
            )
            .with_reason(format!("date patterns matched {:.1}% of sample", ratio * 100.0)),
        )
    }

    fn test_categorical(&self, name: &str, values: &[String]) -> Option<TypeDetectionResult> {
        let mut unique: Vec<&String> = Vec::new();
        for v in values {
            if !unique.contains(&v) {
                unique.push(v);
            }
            if unique.len() > 101 {
                break;
            }
        }

        // Gender columns take precedence over the cardinality rule.
        let gender_named = name.contains("gender") || name.contains("sex");
        if gender_named {
            let all_gender = values
                .iter()
                .all(|v| GENDER_TOKENS.contains(&v.to_lowercase().as_str()));
            if all_gender {
                return Some(
                    TypeDetectionResult::new(
                        DataType::Categorical,
                        SemanticType::Demographic,
                        0.98,
                    )
                    .with_reason("gender column with canonical tokens"),
                );
            }
        }

        let n = values.len();
        let unique_ratio = unique.len() as f64 / n as f64;
        let max_ratio = if n <= 10 { 0.8 } else { 0.5 };
        if unique.len() < 2 || unique.len() > 100 || unique_ratio > max_ratio {
            return None;
        }

        let confidence = (0.7 + 0.2 * (1.0 - unique_ratio)).min(0.95);
        Some(
            TypeDetectionResult::new(DataType::Categorical, SemanticType::Category, confidence)
                .with_reason(format!(
                    "{} distinct labels over {} sampled values",
                    unique.len(),
                    n
                )),
        )
    }

    fn fallback_text(&self, values: &[String]) -> TypeDetectionResult {
        let mean_len =
            values.iter().map(String::len).sum::<usize>() as f64 / values.len() as f64;
        let semantic = if mean_len <= 50.0 {
            SemanticType::Category
        } else {
            SemanticType::Unknown
        };
        TypeDetectionResult::new(DataType::TextGeneral, semantic, 0.3)
            .with_reason("fallback: no specific pattern matched")
    }
}
