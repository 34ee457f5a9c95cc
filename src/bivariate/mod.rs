//! Pairwise column analysis.
//!
//! Pass 1 enumerates every i < j pair of pairable columns (numeric or
//! categorical), deterministically, capped at the configured pair budget.
//! Pass 2 feeds every row to every retained pair's sketch. Finalize produces
//! the three bivariate report buckets; a pair whose kernel rejects its input
//! degrades to zeroed statistics and a warning, never a failed pass.

mod sketches;

use sketches::{CcSketch, NcSketch, NnSketch};
pub(crate) use sketches::NC_GROUP_CAP;

use crate::kernels::{
    anova_f, chi_square_independence, correlation_significance, kruskal_wallis, GroupSummary,
};
use crate::types::{
    round4, round6, Association, BivariateReport, CategoricalCategoricalReport, CorrelationPair,
    DataType, GroupComparison, GroupStats, NumericCategoricalReport, NumericNumericReport,
    ParsedRow, TestResult, Warning, WarningSeverity,
};

/// Report at most this many NN pairs, ranked by |r|.
const TOP_CORRELATIONS: usize = 50;

// ============================================================================
// Pair classification
// ============================================================================

#[derive(Debug)]
enum PairKind {
    /// Both numeric: covariance + scatter sample.
    NumericNumeric(NnSketch),
    /// Both categorical: composite-key contingency counter.
    CategoricalCategorical(CcSketch),
    /// Mixed: per-category moments + bounded samples. The numeric column is
    /// tracked explicitly since it may sit on either side of the pair.
    NumericCategorical { sketch: NcSketch, numeric_first: bool },
}

#[derive(Debug)]
struct TrackedPair {
    a_index: usize,
    b_index: usize,
    a_name: String,
    b_name: String,
    kind: PairKind,
}

impl TrackedPair {
    /// Canonical "colA__colB" key, for logs and warnings.
    fn key(&self) -> String {
        format!("{}__{}", self.a_name, self.b_name)
    }
}

fn pairable(data_type: DataType) -> bool {
    data_type.is_numeric() || data_type.is_categorical()
}

// ============================================================================
// Analyzer
// ============================================================================

#[derive(Debug)]
pub struct BivariateAnalyzer {
    pairs: Vec<TrackedPair>,
    dropped_pairs: usize,
    warnings: Vec<Warning>,
    finalized: bool,
}

impl BivariateAnalyzer {
    /// Enumerate and classify pairs from the header order and detected types.
    ///
    /// Enumeration is deterministic (header order, i < j); the first
    /// `max_pairs` classifiable pairs are retained and the rest counted.
    pub fn new(columns: &[(String, DataType)], max_pairs: usize) -> Self {
        let mut pairs = Vec::new();
        let mut dropped = 0usize;

        for i in 0..columns.len() {
            for j in (i + 1)..columns.len() {
                let (ref a_name, a_type) = columns[i];
                let (ref b_name, b_type) = columns[j];
                if !pairable(a_type) || !pairable(b_type) {
                    continue;
                }
                if pairs.len() >= max_pairs {
                    dropped += 1;
                    continue;
                }

                let kind = match (a_type.is_numeric(), b_type.is_numeric()) {
                    (true, true) => PairKind::NumericNumeric(NnSketch::new()),
                    (false, false) => PairKind::CategoricalCategorical(CcSketch::new()),
                    (numeric_first, _) => PairKind::NumericCategorical {
                        sketch: NcSketch::new(),
                        numeric_first,
                    },
                };
                pairs.push(TrackedPair {
                    a_index: i,
                    b_index: j,
                    a_name: a_name.clone(),
                    b_name: b_name.clone(),
                    kind,
                });
            }
        }

        let mut warnings = Vec::new();
        if dropped > 0 {
            warnings.push(
                Warning::performance(
                    WarningSeverity::Medium,
                    format!(
                        "pair budget reached: tracking {} column pairs, dropped {dropped}",
                        pairs.len()
                    ),
                )
                .with_suggestion("raise maxCorrelationPairs to analyze more pairs"),
            );
        }

        Self {
            pairs,
            dropped_pairs: dropped,
            warnings,
            finalized: false,
        }
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn dropped_pairs(&self) -> usize {
        self.dropped_pairs
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Feed one row to every retained pair.
    pub fn process_row(&mut self, row: &ParsedRow) {
        if self.finalized {
            return;
        }
        for pair in &mut self.pairs {
            let a = row.cell(pair.a_index);
            let b = row.cell(pair.b_index);
            match &mut pair.kind {
                PairKind::NumericNumeric(sketch) => sketch.update(a, b),
                PairKind::CategoricalCategorical(sketch) => sketch.update(a, b),
                PairKind::NumericCategorical { sketch, numeric_first } => {
                    if *numeric_first {
                        sketch.update(a, b);
                    } else {
                        sketch.update(b, a);
                    }
                }
            }
        }
    }

    /// Produce the three report buckets and drop all sketches.
    pub fn finalize(&mut self) -> BivariateReport {
        if self.finalized {
            return BivariateReport::default();
        }
        self.finalized = true;

        let mut nn_pairs: Vec<CorrelationPair> = Vec::new();
        let mut nc_pairs: Vec<GroupComparison> = Vec::new();
        let mut cc_pairs: Vec<Association> = Vec::new();

        let pairs = std::mem::take(&mut self.pairs);
        for pair in pairs {
            match pair.kind {
                PairKind::NumericNumeric(ref sketch) => {
                    nn_pairs.push(finalize_nn(&pair, sketch));
                }
                PairKind::NumericCategorical { ref sketch, numeric_first } => {
                    nc_pairs.push(finalize_nc(&pair, sketch, numeric_first, &mut self.warnings));
                }
                PairKind::CategoricalCategorical(ref sketch) => {
                    cc_pairs.push(finalize_cc(&pair, sketch, &mut self.warnings));
                }
            }
        }

        // Rank correlations by |r| and derive the headline views.
        nn_pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
        let strongest_positive = nn_pairs
            .iter()
            .filter(|p| p.correlation > 0.0)
            .max_by(|a, b| a.correlation.total_cmp(&b.correlation))
            .cloned();
        let strongest_negative = nn_pairs
            .iter()
            .filter(|p| p.correlation < 0.0)
            .min_by(|a, b| a.correlation.total_cmp(&b.correlation))
            .cloned();
        let strong_correlations: Vec<CorrelationPair> = nn_pairs
            .iter()
            .filter(|p| p.correlation.abs() > 0.5)
            .cloned()
            .collect();
        nn_pairs.truncate(TOP_CORRELATIONS);

        BivariateReport {
            numeric_numeric: NumericNumericReport {
                pairs: nn_pairs,
                strongest_positive,
                strongest_negative,
                strong_correlations,
            },
            numeric_categorical: NumericCategoricalReport { pairs: nc_pairs },
            categorical_categorical: CategoricalCategoricalReport { pairs: cc_pairs },
        }
    }

    /// Retained-bytes estimate across every pair sketch.
    pub fn estimated_bytes(&self) -> usize {
        self.pairs
            .iter()
            .map(|p| match &p.kind {
                PairKind::NumericNumeric(s) => s.estimated_bytes(),
                PairKind::CategoricalCategorical(s) => s.estimated_bytes(),
                PairKind::NumericCategorical { sketch, .. } => sketch.estimated_bytes(),
            })
            .sum::<usize>()
            + std::mem::size_of::<Self>()
    }
}

// ============================================================================
// Per-kind finalizers
// ============================================================================

fn correlation_strength(r: f64) -> &'static str {
    let a = r.abs();
    if a >= 0.8 {
        "Very Strong"
    } else if a >= 0.6 {
        "Strong"
    } else if a >= 0.4 {
        "Moderate"
    } else if a >= 0.2 {
        "Weak"
    } else {
        "Very Weak"
    }
}

fn finalize_nn(pair: &TrackedPair, sketch: &NnSketch) -> CorrelationPair {
    let r = sketch.cov.pearson();
    let n = sketch.cov.count();
    let direction = if r > 0.0 {
        "Positive"
    } else if r < 0.0 {
        "Negative"
    } else {
        "None"
    };

    // Scatter insight from the bounded sample: linear unless an axis is flat.
    let sample = sketch.scatter.sample();
    let scatter_insight = if sample.len() < 2 {
        "insufficient sample for a scatter reading".to_string()
    } else {
        let x_constant = sample.windows(2).all(|w| w[0].0 == w[1].0);
        let y_constant = sample.windows(2).all(|w| w[0].1 == w[1].1);
        if x_constant || y_constant {
            format!(
                "{} is constant over the sample; no relationship to read",
                if x_constant { &pair.a_name } else { &pair.b_name }
            )
        } else {
            "linear trend over the sampled points".to_string()
        }
    };

    CorrelationPair {
        column_a: pair.a_name.clone(),
        column_b: pair.b_name.clone(),
        correlation: round6(r),
        sample_size: n,
        significance: correlation_significance(r, n),
        strength: correlation_strength(r).to_string(),
        direction: direction.to_string(),
        scatter_insight,
    }
}

fn finalize_nc(
    pair: &TrackedPair,
    sketch: &NcSketch,
    numeric_first: bool,
    warnings: &mut Vec<Warning>,
) -> GroupComparison {
    let (numeric_column, categorical_column) = if numeric_first {
        (pair.a_name.clone(), pair.b_name.clone())
    } else {
        (pair.b_name.clone(), pair.a_name.clone())
    };

    let mut groups: Vec<GroupStats> = sketch
        .group_order
        .iter()
        .filter_map(|key| sketch.groups.get(key).map(|m| (key, m)))
        .map(|(key, moments)| {
            let mean = moments.mean();
            let sigma = moments.std_dev();
            GroupStats {
                category: key.clone(),
                count: moments.count(),
                mean: round4(mean),
                median: round4(mean),
                std_dev: round4(sigma),
                q1: round4(mean - 0.675 * sigma),
                q3: round4(mean + 0.675 * sigma),
            }
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));

    let summaries: Vec<GroupSummary> = sketch
        .group_order
        .iter()
        .filter_map(|key| sketch.groups.get(key))
        .map(|m| GroupSummary {
            count: m.count(),
            mean: m.mean(),
            variance: m.variance(),
        })
        .collect();
    let anova = anova_f(&summaries);

    let sample_refs: Vec<(&str, &[f64])> = sketch
        .group_order
        .iter()
        .filter_map(|key| sketch.samples.get(key).map(|r| (key.as_str(), r.sample())))
        .collect();
    let kw = kruskal_wallis(&sample_refs);

    if anova.interpretation == "assumptions violated" || kw.interpretation == "assumptions violated"
    {
        warnings.push(Warning::error(
            WarningSeverity::Low,
            format!(
                "pair {}: group tests degraded (too few groups or observations)",
                pair.key()
            ),
        ));
    }
    if sketch.overflowed > 0 {
        warnings.push(
            Warning::data(
                WarningSeverity::Low,
                format!(
                    "pair {}: {} observations beyond the {NC_GROUP_CAP}-group cap were not grouped",
                    pair.key(),
                    sketch.overflowed
                ),
            )
            .with_impact("group comparisons cover the first groups seen"),
        );
    }

    let summary = match (
        groups.iter().max_by(|a, b| a.mean.total_cmp(&b.mean)),
        groups.iter().min_by(|a, b| a.mean.total_cmp(&b.mean)),
    ) {
        (Some(hi), Some(lo)) if groups.len() >= 2 => format!(
            "{numeric_column} averages highest in {categorical_column}='{}' ({:.4}) and lowest in '{}' ({:.4})",
            hi.category, hi.mean, lo.category, lo.mean
        ),
        _ => format!("insufficient groups to compare {numeric_column} across {categorical_column}"),
    };

    GroupComparison {
        numeric_column,
        categorical_column,
        groups,
        anova,
        kruskal_wallis: kw,
        summary,
        quartile_note:
            "group medians and quartiles are normal approximations around the group mean"
                .to_string(),
    }
}

fn finalize_cc(
    pair: &TrackedPair,
    sketch: &CcSketch,
    warnings: &mut Vec<Warning>,
) -> Association {
    let (_, _, matrix) = sketch.contingency();
    let outcome = chi_square_independence(&matrix);

    if outcome.assumptions_violated {
        warnings.push(
            Warning::error(
                WarningSeverity::Low,
                format!(
                    "pair {}: chi-square assumptions violated; association statistics zeroed",
                    pair.key()
                ),
            )
            .with_impact("sparse or degenerate contingency matrix"),
        );
    }

    let top_combination = sketch
        .combos
        .top_k(1)
        .first()
        .map_or_else(
            || "no co-occurrences observed".to_string(),
            |((a, b), count)| {
                format!(
                    "most frequent combination: {}='{a}', {}='{b}' ({count} rows)",
                    pair.a_name, pair.b_name
                )
            },
        );

    let effect_strength = |v: f64| -> &'static str {
        if v >= 0.5 {
            "Strong"
        } else if v >= 0.3 {
            "Moderate"
        } else if v >= 0.1 {
            "Weak"
        } else {
            "Negligible"
        }
    };

    Association {
        column_a: pair.a_name.clone(),
        column_b: pair.b_name.clone(),
        chi_square: TestResult {
            statistic: round4(outcome.test.statistic),
            p_value: outcome.test.p_value,
            interpretation: outcome.test.interpretation.clone(),
        },
        cramers_v: round4(outcome.cramers_v),
        cramers_v_strength: effect_strength(outcome.cramers_v).to_string(),
        contingency_coefficient: round4(outcome.contingency_coefficient),
        contingency_strength: effect_strength(outcome.contingency_coefficient).to_string(),
        top_combination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn columns(spec: &[(&str, DataType)]) -> Vec<(String, DataType)> {
        spec.iter().map(|(n, t)| ((*n).to_string(), *t)).collect()
    }

    fn row(index: u64, cells: Vec<Cell>) -> ParsedRow {
        ParsedRow::new(index, cells)
    }

    #[test]
    fn enumeration_caps_and_warns() {
        let cols = columns(&[
            ("a", DataType::NumericalFloat),
            ("b", DataType::NumericalFloat),
            ("c", DataType::NumericalFloat),
            ("d", DataType::NumericalFloat),
        ]);
        // 6 possible pairs, cap at 2.
        let analyzer = BivariateAnalyzer::new(&cols, 2);
        assert_eq!(analyzer.pair_count(), 2);
        assert_eq!(analyzer.dropped_pairs(), 4);
        assert!(analyzer
            .warnings()
            .iter()
            .any(|w| w.message.contains("pair budget")));
    }

    #[test]
    fn unpairable_columns_are_skipped() {
        let cols = columns(&[
            ("num", DataType::NumericalFloat),
            ("txt", DataType::TextGeneral),
            ("cat", DataType::Categorical),
        ]);
        let analyzer = BivariateAnalyzer::new(&cols, 50);
        // Only (num, cat) qualifies.
        assert_eq!(analyzer.pair_count(), 1);
    }

    #[test]
    fn identical_numeric_columns_correlate_perfectly() {
        let cols = columns(&[
            ("x", DataType::NumericalFloat),
            ("y", DataType::NumericalFloat),
        ]);
        let mut analyzer = BivariateAnalyzer::new(&cols, 50);
        for i in 0..200 {
            let v = f64::from(i);
            analyzer.process_row(&row(u64::from(i as u32), vec![Cell::Float(v), Cell::Float(v)]));
        }
        let report = analyzer.finalize();
        let pair = &report.numeric_numeric.pairs[0];
        assert!((pair.correlation - 1.0).abs() < 1e-9);
        assert_eq!(pair.strength, "Very Strong");
        assert_eq!(pair.direction, "Positive");
        assert_eq!(pair.sample_size, 200);
        assert!(report.numeric_numeric.strongest_positive.is_some());
        assert_eq!(report.numeric_numeric.strong_correlations.len(), 1);
    }

    #[test]
    fn nc_pair_reports_group_means_and_anova() {
        let cols = columns(&[
            ("g", DataType::Categorical),
            ("v", DataType::NumericalInteger),
        ]);
        let mut analyzer = BivariateAnalyzer::new(&cols, 50);
        let data = [("A", 1), ("A", 2), ("A", 3), ("B", 10), ("B", 11), ("B", 12)];
        for (i, (g, v)) in data.iter().enumerate() {
            analyzer.process_row(&row(
                i as u64,
                vec![Cell::Text((*g).to_string()), Cell::Integer(*v)],
            ));
        }
        let report = analyzer.finalize();
        let comparison = &report.numeric_categorical.pairs[0];
        assert_eq!(comparison.numeric_column, "v");
        assert_eq!(comparison.categorical_column, "g");

        let a = comparison.groups.iter().find(|g| g.category == "A").unwrap();
        let b = comparison.groups.iter().find(|g| g.category == "B").unwrap();
        assert!((a.mean - 2.0).abs() < 1e-9);
        assert_eq!(a.count, 3);
        assert!((b.mean - 11.0).abs() < 1e-9);
        assert!(comparison.anova.statistic > 50.0);
        assert!(comparison.anova.p_value <= 0.01);
        assert!(comparison.summary.contains("highest"));
    }

    #[test]
    fn cc_pair_builds_association() {
        let cols = columns(&[
            ("left", DataType::Categorical),
            ("right", DataType::Categorical),
        ]);
        let mut analyzer = BivariateAnalyzer::new(&cols, 50);
        // Strongly associated: left determines right, 50 rows each.
        for i in 0..100u64 {
            let (l, r) = if i % 2 == 0 { ("a", "p") } else { ("b", "q") };
            analyzer.process_row(&row(
                i,
                vec![Cell::Text(l.to_string()), Cell::Text(r.to_string())],
            ));
        }
        let report = analyzer.finalize();
        let assoc = &report.categorical_categorical.pairs[0];
        assert!(assoc.chi_square.p_value <= 0.001);
        assert!(assoc.cramers_v > 0.9);
        assert_eq!(assoc.cramers_v_strength, "Strong");
        assert!(assoc.top_combination.contains("left="));
    }

    #[test]
    fn degenerate_cc_pair_warns_but_never_fails() {
        let cols = columns(&[
            ("left", DataType::Categorical),
            ("right", DataType::Categorical),
        ]);
        let mut analyzer = BivariateAnalyzer::new(&cols, 50);
        for i in 0..3u64 {
            analyzer.process_row(&row(
                i,
                vec![
                    Cell::Text(format!("l{i}")),
                    Cell::Text(format!("r{i}")),
                ],
            ));
        }
        let report = analyzer.finalize();
        let assoc = &report.categorical_categorical.pairs[0];
        assert_eq!(assoc.chi_square.p_value, 1.0);
        assert_eq!(assoc.cramers_v, 0.0);
        assert!(analyzer
            .warnings()
            .iter()
            .any(|w| w.message.contains("chi-square assumptions")));
    }
}
