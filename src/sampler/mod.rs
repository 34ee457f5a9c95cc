//! Smart sampling: decide whether a representative subsample can stand in
//! for a whole-file scan, collect it in bounded memory, and score it.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::{SampleMethod, SamplingOptions};
use crate::stats::{Reservoir, SeededLcg};
use crate::types::{round4, ParsedRow, Warning, WarningSeverity};

/// Auto-sampling defaults (fractions of the estimated row count).
const AUTO_FRACTION_LARGE: f64 = 0.05;
const AUTO_FRACTION: f64 = 0.10;
const AUTO_MIN_ROWS: u64 = 10_000;
const AUTO_MAX_ROWS: u64 = 1_000_000;
/// Inputs above this byte size use the smaller auto fraction.
const LARGE_FILE_BYTES: u64 = 10 << 30;
/// Fallback target when nothing better can be resolved.
const FALLBACK_MAX_ROWS: u64 = 100_000;
/// Bounded number of strata tracked before overflowing to a shared pool.
const MAX_STRATA: usize = 50;

// ============================================================================
// Plan
// ============================================================================

/// Resolved sampling decision: strategy, target size, and determinism.
#[derive(Debug, Clone)]
pub struct SamplePlan {
    pub method: SampleMethod,
    pub target: u64,
    pub seed: Option<u64>,
    pub stratify_by: Option<String>,
    /// Row-count estimate backing the systematic step; None falls back to
    /// the target itself.
    pub estimated_total_rows: Option<u64>,
    pub warnings: Vec<Warning>,
}

/// Decide whether sampling applies and resolve the target size.
///
/// Enabled when auto-sampling is on and the input exceeds the size
/// threshold, or when any sampling option was set explicitly. Target
/// resolution priority: explicit rows, explicit percentage, explicit bytes
/// over average row bytes, auto default, fallback.
pub fn plan_sampling(
    options: &SamplingOptions,
    file_size_bytes: Option<u64>,
    estimated_total_rows: Option<u64>,
    avg_row_bytes: Option<f64>,
    sampling_threshold: u64,
) -> Option<SamplePlan> {
    let auto_triggered = options.auto_sample
        && file_size_bytes.is_some_and(|size| size > sampling_threshold);
    if !auto_triggered && !options.any_explicit() {
        return None;
    }

    let mut warnings = Vec::new();

    let target = if let Some(rows) = options.sample_rows {
        rows
    } else if let Some(pct) = options.sample_percentage {
        match estimated_total_rows {
            Some(n) => ((n as f64) * pct / 100.0).ceil() as u64,
            None => {
                warnings.push(Warning::error(
                    WarningSeverity::Low,
                    "samplePercentage set but total row count unknown; using fallback target",
                ));
                FALLBACK_MAX_ROWS
            }
        }
    } else if let Some(bytes) = options.sample_size_bytes {
        let per_row = avg_row_bytes.unwrap_or(100.0).max(1.0);
        ((bytes as f64) / per_row).ceil() as u64
    } else if auto_triggered {
        let fraction = if file_size_bytes.is_some_and(|s| s > LARGE_FILE_BYTES) {
            AUTO_FRACTION_LARGE
        } else {
            AUTO_FRACTION
        };
        let base = estimated_total_rows.unwrap_or(AUTO_MAX_ROWS);
        (((base as f64) * fraction) as u64).clamp(AUTO_MIN_ROWS, AUTO_MAX_ROWS)
    } else {
        match estimated_total_rows {
            Some(n) => (((n as f64) * 0.10) as u64).min(FALLBACK_MAX_ROWS).max(1),
            None => FALLBACK_MAX_ROWS,
        }
    };

    let mut method = options.sample_method.unwrap_or(SampleMethod::Random);
    let mut stratify_by = options.stratify_by.clone();
    if method == SampleMethod::Stratified && stratify_by.is_none() {
        warnings.push(
            Warning::error(
                WarningSeverity::Medium,
                "stratified sampling requested without stratifyBy; downgrading to random",
            )
            .with_suggestion("set samplingOptions.stratifyBy to a categorical column"),
        );
        method = SampleMethod::Random;
        stratify_by = None;
    }

    debug!(?method, target, seed = ?options.seed, "sampling plan resolved");
    Some(SamplePlan {
        method,
        target: target.max(1),
        seed: options.seed,
        stratify_by,
        estimated_total_rows,
        warnings,
    })
}

// ============================================================================
// Quality metrics
// ============================================================================

#[derive(Debug, Clone)]
pub struct SampleQuality {
    /// min(1, samples / target)
    pub representative_score: f64,
    /// min(1, sqrt(10 * samples / population))
    pub convergence_score: f64,
    /// Stratified only: 1 minus the normalized absolute deviation between
    /// observed and expected strata counts.
    pub balance_score: Option<f64>,
}

/// Result of a collection pass: the rows plus how trustworthy they are.
#[derive(Debug)]
pub struct SampleResult {
    pub rows: Vec<ParsedRow>,
    pub quality: SampleQuality,
    pub warnings: Vec<Warning>,
}

// ============================================================================
// Collector
// ============================================================================

#[derive(Debug)]
enum Strategy {
    Random {
        reservoir: Reservoir<ParsedRow>,
    },
    Stratified {
        column_index: usize,
        /// Per-stratum reservoirs in first-seen order; trimmed to the
        /// proportional allocation at finish.
        strata: HashMap<String, Reservoir<ParsedRow>>,
        strata_order: Vec<String>,
        strata_totals: HashMap<String, u64>,
        overflow: Reservoir<ParsedRow>,
        overflow_total: u64,
    },
    Systematic {
        step: u64,
        offset: u64,
        kept: Vec<ParsedRow>,
    },
    Head {
        kept: Vec<ParsedRow>,
    },
}

/// Streaming sample collector for a resolved [`SamplePlan`].
#[derive(Debug)]
pub struct SmartSampler {
    plan: SamplePlan,
    strategy: Strategy,
    observed: u64,
    warnings: Vec<Warning>,
}

impl SmartSampler {
    /// Build the collector, resolving the stratification column against the
    /// header. A missing column downgrades to random with a warning; the
    /// seed is honoured either way.
    pub fn new(mut plan: SamplePlan, headers: &[String]) -> Self {
        let mut warnings = std::mem::take(&mut plan.warnings);
        let target = plan.target as usize;
        let seed = plan.seed;

        let make_reservoir = move |seed_offset: u64| match seed {
            Some(seed) => Reservoir::with_seed(target.max(1), seed + seed_offset),
            None => Reservoir::new(target.max(1)),
        };

        let strategy = match plan.method {
            SampleMethod::Stratified => {
                let column_index = plan
                    .stratify_by
                    .as_ref()
                    .and_then(|name| headers.iter().position(|h| h == name));
                match column_index {
                    Some(idx) => Strategy::Stratified {
                        column_index: idx,
                        strata: HashMap::new(),
                        strata_order: Vec::new(),
                        strata_totals: HashMap::new(),
                        overflow: make_reservoir(u64::from(u32::MAX)),
                        overflow_total: 0,
                    },
                    None => {
                        warn!(
                            column = plan.stratify_by.as_deref().unwrap_or(""),
                            "stratify column not found; downgrading to random sampling"
                        );
                        warnings.push(
                            Warning::error(
                                WarningSeverity::Medium,
                                format!(
                                    "stratify column '{}' not found in header; downgraded to random sampling",
                                    plan.stratify_by.as_deref().unwrap_or("")
                                ),
                            )
                            .with_impact("sample is uniform rather than stratified"),
                        );
                        plan.method = SampleMethod::Random;
                        Strategy::Random {
                            reservoir: make_reservoir(0),
                        }
                    }
                }
            }
            SampleMethod::Random => Strategy::Random {
                reservoir: make_reservoir(0),
            },
            SampleMethod::Systematic => {
                let total = plan.estimated_total_rows.unwrap_or(plan.target);
                let step = (total / plan.target.max(1)).max(1);
                let offset = match plan.seed {
                    Some(seed) => seed % step,
                    None => SeededLcg::new(rand::random::<u64>()).next_range(step),
                };
                Strategy::Systematic {
                    step,
                    offset,
                    kept: Vec::new(),
                }
            }
            SampleMethod::Head => Strategy::Head { kept: Vec::new() },
        };

        Self {
            plan,
            strategy,
            observed: 0,
            warnings,
        }
    }

    pub fn method(&self) -> SampleMethod {
        self.plan.method
    }

    /// True once no further rows can change the sample (head strategy full).
    pub fn is_satisfied(&self) -> bool {
        match &self.strategy {
            Strategy::Head { kept } => kept.len() as u64 >= self.plan.target,
            _ => false,
        }
    }

    pub fn observe(&mut self, row: ParsedRow) {
        self.observed += 1;
        let target = self.plan.target;
        match &mut self.strategy {
            Strategy::Random { reservoir } => reservoir.update(row),
            Strategy::Stratified {
                column_index,
                strata,
                strata_order,
                strata_totals,
                overflow,
                overflow_total,
            } => {
                let key = row
                    .cell(*column_index)
                    .to_key()
                    .unwrap_or_else(|| "(null)".to_string());
                *strata_totals.entry(key.clone()).or_insert(0) += 1;
                if let Some(reservoir) = strata.get_mut(&key) {
                    reservoir.update(row);
                } else if strata.len() < MAX_STRATA {
                    // Deterministic per-stratum seed offset by arrival order.
                    let offset = strata_order.len() as u64 + 1;
                    let mut reservoir = match self.plan.seed {
                        Some(seed) => Reservoir::with_seed(target as usize, seed + offset),
                        None => Reservoir::new(target as usize),
                    };
                    reservoir.update(row);
                    strata.insert(key.clone(), reservoir);
                    strata_order.push(key);
                } else {
                    *overflow_total += 1;
                    overflow.update(row);
                }
            }
            Strategy::Systematic { step, offset, kept } => {
                if kept.len() as u64 >= target {
                    return;
                }
                if (self.observed - 1) % *step == *offset {
                    kept.push(row);
                }
            }
            Strategy::Head { kept } => {
                if (kept.len() as u64) < target {
                    kept.push(row);
                }
            }
        }
    }

    /// Close the pass: trim strata to their proportional allocation, score
    /// the sample, and hand the rows back in a deterministic order.
    pub fn finish(mut self) -> SampleResult {
        let target = self.plan.target;
        let population = self.observed;

        let (mut rows, balance_score) = match self.strategy {
            Strategy::Random { reservoir } => (reservoir.into_sample(), None),
            Strategy::Stratified {
                strata,
                strata_order,
                strata_totals,
                overflow,
                overflow_total,
                ..
            } => {
                let mut rows = Vec::new();
                let tracked_total: u64 = strata_order
                    .iter()
                    .filter_map(|k| strata_totals.get(k))
                    .sum();
                let denominator = tracked_total.max(1) as f64;

                let mut deviation_sum = 0.0;
                let mut expected_sum = 0.0;
                let mut strata_map = strata;
                for key in &strata_order {
                    let Some(reservoir) = strata_map.remove(key) else {
                        continue;
                    };
                    let stratum_total = *strata_totals.get(key).unwrap_or(&0);
                    // Proportional allocation with a floor of one row.
                    let allocation = (((target as f64) * stratum_total as f64 / denominator)
                        .round() as usize)
                        .max(1);
                    let taken: Vec<ParsedRow> = reservoir
                        .into_sample()
                        .into_iter()
                        .take(allocation)
                        .collect();
                    let expected = (target as f64) * stratum_total as f64 / denominator;
                    deviation_sum += (taken.len() as f64 - expected).abs();
                    expected_sum += expected;
                    rows.extend(taken);
                }
                if overflow_total > 0 {
                    self.warnings.push(Warning::data(
                        WarningSeverity::Low,
                        format!(
                            "{overflow_total} rows fell beyond the {MAX_STRATA}-stratum cap and were pooled into a shared reservoir"
                        ),
                    ));
                    rows.extend(overflow.into_sample());
                }
                let balance = if expected_sum > 0.0 {
                    (1.0 - deviation_sum / expected_sum).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (rows, Some(balance))
            }
            Strategy::Systematic { kept, .. } | Strategy::Head { kept } => (kept, None),
        };

        // Stable order keeps downstream analysis deterministic.
        rows.sort_by_key(|r| r.index);
        rows.truncate(target as usize);

        let samples = rows.len() as u64;
        let representative_score = if target == 0 {
            0.0
        } else {
            (samples as f64 / target as f64).min(1.0)
        };
        let convergence_score = if population == 0 {
            0.0
        } else {
            (10.0 * samples as f64 / population as f64).sqrt().min(1.0)
        };

        SampleResult {
            rows,
            quality: SampleQuality {
                representative_score: round4(representative_score),
                convergence_score: round4(convergence_score),
                balance_score: balance_score.map(round4),
            },
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn options() -> SamplingOptions {
        SamplingOptions {
            auto_sample: false,
            ..SamplingOptions::default()
        }
    }

    fn rows_with_region(n: u64) -> Vec<ParsedRow> {
        (0..n)
            .map(|i| {
                let region = if i % 4 == 0 { "north" } else { "south" };
                ParsedRow::new(
                    i,
                    vec![Cell::Integer(i as i64), Cell::Text(region.to_string())],
                )
            })
            .collect()
    }

    #[test]
    fn disabled_when_nothing_requested() {
        let plan = plan_sampling(&options(), Some(1_000), Some(1_000), None, 1 << 30);
        assert!(plan.is_none());
    }

    #[test]
    fn auto_sampling_engages_over_threshold() {
        let mut opts = options();
        opts.auto_sample = true;
        let plan = plan_sampling(&opts, Some(2 << 30), Some(50_000_000), None, 1 << 30)
            .expect("auto sampling should engage");
        assert_eq!(plan.method, SampleMethod::Random);
        // 10% of 50M clamps to the 1M ceiling.
        assert_eq!(plan.target, AUTO_MAX_ROWS);
    }

    #[test]
    fn explicit_rows_take_priority() {
        let mut opts = options();
        opts.sample_rows = Some(123);
        opts.sample_percentage = Some(50.0);
        let plan = plan_sampling(&opts, None, Some(10_000), None, 1 << 30).unwrap();
        assert_eq!(plan.target, 123);
    }

    #[test]
    fn percentage_resolves_against_row_estimate() {
        let mut opts = options();
        opts.sample_percentage = Some(10.0);
        let plan = plan_sampling(&opts, None, Some(5_000), None, 1 << 30).unwrap();
        assert_eq!(plan.target, 500);
    }

    #[test]
    fn seeded_random_sampling_is_reproducible() {
        let mut opts = options();
        opts.sample_rows = Some(20);
        opts.seed = Some(99);
        let plan = plan_sampling(&opts, None, Some(1_000), None, 1 << 30).unwrap();
        let headers = vec!["id".to_string(), "region".to_string()];

        let run = |plan: SamplePlan| {
            let mut sampler = SmartSampler::new(plan, &headers);
            for row in rows_with_region(1_000) {
                sampler.observe(row);
            }
            sampler
                .finish()
                .rows
                .iter()
                .map(|r| r.index)
                .collect::<Vec<_>>()
        };

        assert_eq!(run(plan.clone()), run(plan));
    }

    #[test]
    fn stratified_keeps_proportions() {
        let mut opts = options();
        opts.sample_rows = Some(100);
        opts.sample_method = Some(SampleMethod::Stratified);
        opts.stratify_by = Some("region".to_string());
        opts.seed = Some(42);
        let plan = plan_sampling(&opts, None, Some(1_000), None, 1 << 30).unwrap();
        let headers = vec!["id".to_string(), "region".to_string()];
        let mut sampler = SmartSampler::new(plan, &headers);
        for row in rows_with_region(1_000) {
            sampler.observe(row);
        }
        let result = sampler.finish();

        // Population is 25% north / 75% south; the sample should be close.
        let north = result
            .rows
            .iter()
            .filter(|r| r.cell(1).as_str() == Some("north"))
            .count();
        assert!((15..=35).contains(&north), "north count {north}");
        let balance = result.quality.balance_score.unwrap();
        assert!(balance > 0.8, "balance {balance}");
    }

    #[test]
    fn missing_stratify_column_downgrades_to_random() {
        let mut opts = options();
        opts.sample_rows = Some(50);
        opts.sample_method = Some(SampleMethod::Stratified);
        opts.stratify_by = Some("region".to_string());
        opts.seed = Some(7);
        let plan = plan_sampling(&opts, None, Some(1_000), None, 1 << 30).unwrap();
        // Header has no "region" column.
        let headers = vec!["id".to_string(), "value".to_string()];
        let mut sampler = SmartSampler::new(plan, &headers);
        assert_eq!(sampler.method(), SampleMethod::Random);
        for row in rows_with_region(500) {
            sampler.observe(row);
        }
        let result = sampler.finish();
        assert_eq!(result.rows.len(), 50);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("downgraded to random")));
    }

    #[test]
    fn systematic_takes_every_step_th_row() {
        let mut opts = options();
        opts.sample_rows = Some(10);
        opts.sample_method = Some(SampleMethod::Systematic);
        opts.seed = Some(3);
        let plan = plan_sampling(&opts, None, Some(100), None, 1 << 30).unwrap();
        let headers = vec!["id".to_string(), "region".to_string()];
        let mut sampler = SmartSampler::new(plan, &headers);
        for row in rows_with_region(100) {
            sampler.observe(row);
        }
        let result = sampler.finish();
        assert_eq!(result.rows.len(), 10);
        // step = 10, offset = 3 % 10 = 3: indices 3, 13, 23, ...
        assert_eq!(result.rows[0].index, 3);
        assert_eq!(result.rows[1].index, 13);
    }

    #[test]
    fn head_stops_early() {
        let mut opts = options();
        opts.sample_rows = Some(5);
        opts.sample_method = Some(SampleMethod::Head);
        let plan = plan_sampling(&opts, None, None, None, 1 << 30).unwrap();
        let headers = vec!["id".to_string(), "region".to_string()];
        let mut sampler = SmartSampler::new(plan, &headers);
        for row in rows_with_region(100) {
            if sampler.is_satisfied() {
                break;
            }
            sampler.observe(row);
        }
        let result = sampler.finish();
        let indices: Vec<u64> = result.rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(result.quality.representative_score, 1.0);
    }
}
