//! Numeric column analyzer: moments, streaming quantiles, normality,
//! outlier fences, and value-pattern notes.

use crate::kernels::{jarque_bera, kolmogorov_smirnov, shapiro_wilk};
use crate::stats::{exact_quantile, BoundedFrequencyCounter, MomentAccumulator, P2Quantile, Reservoir};
use crate::types::{
    round2, round4, Cell, ColumnDetails, ColumnReport, Descriptives, DistributionShape,
    NormalityReport, NumericDetails, NumericPatterns, OutlierReport, Quantiles, TestResult,
    TypeDetectionResult, Warning,
};

use super::{AnalyzerError, AnalyzerOptions, ColumnCounts, UNIVARIATE_SEED};

/// Tracked quantiles, ascending. The report quotes all of them plus IQR.
const TRACKED_QUANTILES: [f64; 9] = [0.01, 0.05, 0.10, 0.25, 0.50, 0.75, 0.90, 0.95, 0.99];

const RESERVOIR_CAP: usize = 100;
const MODE_COUNTER_CAP: usize = 100;

/// Which detectors and tests this column runs, from the config knobs.
#[derive(Debug, Clone, Copy)]
struct EnabledMethods {
    iqr: bool,
    zscore: bool,
    modified_zscore: bool,
    shapiro_wilk: bool,
    jarque_bera: bool,
    kolmogorov_smirnov: bool,
}

impl EnabledMethods {
    fn from_options(options: &AnalyzerOptions) -> Self {
        let has = |list: &[String], name: &str| list.iter().any(|m| m == name);
        Self {
            iqr: has(&options.outlier_methods, "iqr"),
            zscore: has(&options.outlier_methods, "zscore"),
            modified_zscore: has(&options.outlier_methods, "modified_zscore"),
            shapiro_wilk: has(&options.normality_tests, "shapiro_wilk"),
            jarque_bera: has(&options.normality_tests, "jarque_bera"),
            kolmogorov_smirnov: has(&options.normality_tests, "kolmogorov_smirnov"),
        }
    }
}

#[derive(Debug)]
pub struct NumericAnalyzer {
    name: String,
    detection: TypeDetectionResult,
    counts: ColumnCounts,
    moments: MomentAccumulator,
    quantiles: Vec<P2Quantile>,
    reservoir: Reservoir<f64>,
    mode_counter: BoundedFrequencyCounter<String>,
    enabled: EnabledMethods,
    zero_count: u64,
    negative_count: u64,
    mismatches: u64,
    warnings: Vec<Warning>,
    finalized: bool,
}

impl NumericAnalyzer {
    pub fn new(name: &str, detection: TypeDetectionResult, options: &AnalyzerOptions) -> Self {
        Self {
            name: name.to_string(),
            detection,
            counts: ColumnCounts::default(),
            moments: MomentAccumulator::new(),
            quantiles: TRACKED_QUANTILES.iter().map(|&q| P2Quantile::new(q)).collect(),
            reservoir: Reservoir::with_seed(RESERVOIR_CAP, UNIVARIATE_SEED),
            mode_counter: BoundedFrequencyCounter::new(MODE_COUNTER_CAP),
            enabled: EnabledMethods::from_options(options),
            zero_count: 0,
            negative_count: 0,
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
        if cell.is_null() {
            self.counts.record_null();
            return;
        }
        let Some(v) = cell.as_f64() else {
            // Unparseable or non-finite: counted as null, flagged once at the end.
            self.counts.record_null();
            self.mismatches += 1;
            return;
        };

        self.counts.record_valid();
        self.moments.update(v);
        for estimator in &mut self.quantiles {
            estimator.update(v);
        }
        self.reservoir.update(v);
        self.mode_counter.update(canonical_value_key(v));
        if v == 0.0 {
            self.zero_count += 1;
        }
        if v < 0.0 {
            self.negative_count += 1;
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
            ColumnDetails::Numeric(self.build_details())
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

    fn build_details(&self) -> NumericDetails {
        let valid = self.counts.valid;

        // Quantile estimates, sorted ascending so the reported sequence is
        // monotone and median always lands inside [Q1, Q3].
        let mut estimates: Vec<f64> = self.quantiles.iter().map(P2Quantile::quantile).collect();
        estimates.sort_by(|a, b| a.total_cmp(b));
        let [p1, p5, p10, p25, median, p75, p90, p95, p99] =
            [estimates[0], estimates[1], estimates[2], estimates[3], estimates[4],
             estimates[5], estimates[6], estimates[7], estimates[8]];
        let iqr = p75 - p25;

        let mut sample: Vec<f64> = self.reservoir.sample().to_vec();
        sample.sort_by(|a, b| a.total_cmp(b));
        let mad = mad_from_sample(&sample, median);

        // Descriptives quote the sample forms; the population forms stay
        // internal to the test kernels.
        let sample_variance = self.moments.sample_variance();
        let sample_std = sample_variance.sqrt();
        let mean = self.moments.mean();
        let cv = if mean == 0.0 { 0.0 } else { sample_std / mean.abs() };
        let descriptives = Descriptives {
            min: round4(self.moments.min()),
            max: round4(self.moments.max()),
            range: round4(self.moments.range()),
            sum: round4(self.moments.sum()),
            mean: round4(mean),
            median: round4(median),
            modes: self.modes(),
            std_dev: round4(sample_std),
            variance: round4(sample_variance),
            coefficient_of_variation: round4(cv),
        };

        let quantiles = Quantiles {
            p1: round4(p1),
            p5: round4(p5),
            p10: round4(p10),
            p25: round4(p25),
            p75: round4(p75),
            p90: round4(p90),
            p95: round4(p95),
            p99: round4(p99),
            iqr: round4(iqr),
            mad: round4(mad),
        };

        let skewness = self.moments.skewness();
        let kurtosis = self.moments.kurtosis();
        let distribution = DistributionShape {
            skewness: round4(skewness),
            kurtosis: round4(kurtosis),
            skewness_interpretation: interpret_skewness(skewness),
            kurtosis_interpretation: interpret_kurtosis(kurtosis),
            histogram_bins: histogram_bin_count(valid),
        };

        let not_requested = || TestResult::new(0.0, 1.0, "not requested");
        let normality = NormalityReport {
            shapiro_wilk: if self.enabled.shapiro_wilk {
                shapiro_wilk(&sample)
            } else {
                not_requested()
            },
            jarque_bera: if self.enabled.jarque_bera {
                jarque_bera(valid, skewness, kurtosis)
            } else {
                not_requested()
            },
            kolmogorov_smirnov: if self.enabled.kolmogorov_smirnov {
                kolmogorov_smirnov(&sample)
            } else {
                not_requested()
            },
        };

        let outliers = self.build_outliers(&sample, p25, p75, iqr, median, mad);
        let patterns = self.build_patterns(&sample);

        NumericDetails {
            descriptives,
            quantiles,
            distribution,
            normality,
            outliers,
            patterns,
        }
    }

    /// Values sharing the highest observed frequency (ties kept, singletons
    /// suppressed), ascending.
    fn modes(&self) -> Vec<f64> {
        let top = self.mode_counter.top_k(MODE_COUNTER_CAP);
        let Some(&(_, top_count)) = top.first() else {
            return Vec::new();
        };
        if top_count < 2 {
            return Vec::new();
        }
        let mut modes: Vec<f64> = top
            .iter()
            .take_while(|(_, count)| *count == top_count)
            .filter_map(|(key, _)| key.parse().ok())
            .map(round4)
            .collect();
        modes.sort_by(|a, b| a.total_cmp(b));
        modes
    }

    fn build_outliers(
        &self,
        sample: &[f64],
        p25: f64,
        p75: f64,
        iqr: f64,
        median: f64,
        mad: f64,
    ) -> OutlierReport {
        let mild_lower = p25 - 1.5 * iqr;
        let mild_upper = p75 + 1.5 * iqr;
        let extreme_lower = p25 - 3.0 * iqr;
        let extreme_upper = p75 + 3.0 * iqr;
        let mean = self.moments.mean();
        let std_dev = self.moments.sample_variance().sqrt();

        let mut mild = 0usize;
        let mut extreme = 0usize;
        let mut zscore = 0usize;
        let mut modified = 0usize;
        let mut flagged = 0usize;
        for &x in sample {
            let is_mild = self.enabled.iqr && (x < mild_lower || x > mild_upper);
            let is_extreme = self.enabled.iqr && (x < extreme_lower || x > extreme_upper);
            let is_z =
                self.enabled.zscore && std_dev > 0.0 && ((x - mean) / std_dev).abs() > 3.0;
            let is_modified = self.enabled.modified_zscore
                && mad > 0.0
                && (0.6745 * (x - median) / mad).abs() > 3.5;
            mild += usize::from(is_mild);
            extreme += usize::from(is_extreme);
            zscore += usize::from(is_z);
            modified += usize::from(is_modified);
            flagged += usize::from(is_mild || is_extreme || is_z || is_modified);
        }

        let share = if sample.is_empty() {
            0.0
        } else {
            flagged as f64 / sample.len() as f64
        };
        let potential_impact = if share > 0.10 {
            "high - outliers will distort means and regressions; prefer robust statistics"
        } else if share > 0.02 {
            "moderate - inspect flagged values before trusting tail statistics"
        } else {
            "low - distribution tails look clean"
        };

        OutlierReport {
            mild_lower_fence: round4(mild_lower),
            mild_upper_fence: round4(mild_upper),
            extreme_lower_fence: round4(extreme_lower),
            extreme_upper_fence: round4(extreme_upper),
            mild_outliers: mild,
            extreme_outliers: extreme,
            zscore_outliers: zscore,
            modified_zscore_outliers: modified,
            flagged_total: flagged,
            evaluated_sample_size: sample.len(),
            potential_impact: potential_impact.to_string(),
        }
    }

    fn build_patterns(&self, sample: &[f64]) -> NumericPatterns {
        let valid = self.counts.valid.max(1) as f64;
        let zero_percentage = round2(self.zero_count as f64 * 100.0 / valid);
        let negative_percentage = round2(self.negative_count as f64 * 100.0 / valid);

        let round_numbers_note = if sample.is_empty() {
            None
        } else {
            let n = sample.len() as f64;
            let mult5 = sample.iter().filter(|&&v| is_multiple_of(v, 5.0)).count() as f64 / n;
            let mult10 = sample.iter().filter(|&&v| is_multiple_of(v, 10.0)).count() as f64 / n;
            if mult5 > 0.30 || mult10 > 0.10 {
                Some(format!(
                    "values cluster on round numbers ({:.0}% multiples of 5, {:.0}% of 10); possibly rounded at entry",
                    mult5 * 100.0,
                    mult10 * 100.0
                ))
            } else {
                None
            }
        };

        let log_transform_hint = if !sample.is_empty()
            && sample.iter().all(|&v| v > 0.0)
            && self.moments.max() > 1000.0
        {
            Some("all values positive with a wide range; a log transformation may stabilize variance".to_string())
        } else {
            None
        };

        NumericPatterns {
            zero_percentage,
            negative_percentage,
            round_numbers_note,
            log_transform_hint,
        }
    }

    pub fn clear_transient_memory(&mut self) {
        self.warnings.shrink_to_fit();
    }

    pub fn estimated_bytes(&self) -> usize {
        self.moments.estimated_bytes()
            + self.quantiles.iter().map(P2Quantile::estimated_bytes).sum::<usize>()
            + self.reservoir.estimated_bytes()
            + self.mode_counter.estimated_bytes(|k| k.len())
            + std::mem::size_of::<Self>()
    }
}

/// Median absolute deviation around `center`, over a sorted sample.
fn mad_from_sample(sorted_sample: &[f64], center: f64) -> f64 {
    if sorted_sample.is_empty() {
        return 0.0;
    }
    let mut deviations: Vec<f64> = sorted_sample.iter().map(|x| (x - center).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    exact_quantile(&deviations, 0.5)
}

/// Canonical key so 3, 3.0 and "3" count as the same mode candidate.
fn canonical_value_key(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn is_multiple_of(v: f64, base: f64) -> bool {
    v != 0.0 && (v / base).fract().abs() < 1e-9
}

fn interpret_skewness(s: f64) -> String {
    let direction = if s >= 0.0 { "right" } else { "left" };
    if s.abs() < 0.5 {
        "approximately symmetric".to_string()
    } else if s.abs() < 1.0 {
        format!("moderately skewed {direction}")
    } else {
        format!("highly skewed {direction}")
    }
}

fn interpret_kurtosis(k: f64) -> String {
    if k > 1.0 {
        "heavy-tailed (leptokurtic)".to_string()
    } else if k < -1.0 {
        "light-tailed (platykurtic)".to_string()
    } else {
        "near-normal tails (mesokurtic)".to_string()
    }
}

/// `min(10, ceil(sqrt(valid)))`, never zero for a non-empty column.
fn histogram_bin_count(valid: u64) -> usize {
    ((valid as f64).sqrt().ceil() as usize).clamp(1, 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, SemanticType};

    fn analyzer() -> NumericAnalyzer {
        NumericAnalyzer::new(
            "x",
            TypeDetectionResult::new(DataType::NumericalInteger, SemanticType::Unknown, 0.95),
            &AnalyzerOptions::default(),
        )
    }

    fn details(report: &ColumnReport) -> &NumericDetails {
        match &report.details {
            ColumnDetails::Numeric(d) => d,
            other => panic!("expected numeric details, got {other:?}"),
        }
    }

    #[test]
    fn one_to_five_matches_known_statistics() {
        let mut a = analyzer();
        for i in 1..=5 {
            a.process_value(&Cell::Integer(i));
        }
        let report = a.finalize().unwrap();
        let d = details(&report);

        assert_eq!(report.valid_count, 5);
        assert!((d.descriptives.mean - 3.0).abs() < 1e-9);
        assert!((d.descriptives.median - 3.0).abs() < 1e-9);
        assert_eq!(d.descriptives.min, 1.0);
        assert_eq!(d.descriptives.max, 5.0);
        // Sample sigma of 1..5 is 1.5811 (population would be 1.4142).
        assert!((d.descriptives.std_dev - 1.5811).abs() < 1e-3);
        assert!((d.descriptives.variance - 2.5).abs() < 1e-3);
        assert!((d.distribution.skewness).abs() < 1e-9);
        assert!((d.distribution.kurtosis - (-1.3)).abs() < 1e-6);
        assert_eq!(report.quality_flag, crate::types::QualityFlag::Good);
    }

    #[test]
    fn median_stays_inside_iqr() {
        let mut a = analyzer();
        for i in 0..5000 {
            // Lumpy but unimodal stream.
            a.process_value(&Cell::Float(((i % 97) as f64).sqrt() * 10.0));
        }
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert!(d.quantiles.p25 <= d.descriptives.median);
        assert!(d.descriptives.median <= d.quantiles.p75);
        // Full quantile sequence is monotone.
        let q = &d.quantiles;
        let seq = [q.p1, q.p5, q.p10, q.p25, d.descriptives.median, q.p75, q.p90, q.p95, q.p99];
        for w in seq.windows(2) {
            assert!(w[0] <= w[1], "quantile sequence not monotone: {seq:?}");
        }
    }

    #[test]
    fn nulls_and_garbage_count_as_null() {
        let mut a = analyzer();
        a.process_value(&Cell::Integer(1));
        a.process_value(&Cell::Null);
        a.process_value(&Cell::Text("not a number".to_string()));
        a.process_value(&Cell::Integer(2));
        let report = a.finalize().unwrap();
        assert_eq!(report.total_count, 4);
        assert_eq!(report.valid_count, 2);
        assert_eq!(report.null_count, 2);
        assert!(a
            .warnings()
            .iter()
            .any(|w| w.message.contains("did not match the detected type")));
    }

    #[test]
    fn modes_require_repeats() {
        let mut a = analyzer();
        for v in [1, 2, 3, 4, 5] {
            a.process_value(&Cell::Integer(v));
        }
        let report = a.finalize().unwrap();
        assert!(details(&report).descriptives.modes.is_empty());

        let mut b = analyzer();
        for v in [1, 2, 2, 3, 3, 4] {
            b.process_value(&Cell::Integer(v));
        }
        let report = b.finalize().unwrap();
        assert_eq!(details(&report).descriptives.modes, vec![2.0, 3.0]);
    }

    #[test]
    fn outlier_fences_catch_planted_extreme() {
        let mut a = analyzer();
        for _ in 0..99 {
            a.process_value(&Cell::Float(10.0));
        }
        for i in 0..20 {
            a.process_value(&Cell::Float(9.0 + f64::from(i) * 0.1));
        }
        a.process_value(&Cell::Float(1000.0));
        let report = a.finalize().unwrap();
        let d = details(&report);
        // The planted extreme may or may not survive the reservoir, but the
        // fences themselves must be tight around the bulk.
        assert!(d.outliers.mild_upper_fence < 500.0);
        assert_eq!(d.outliers.evaluated_sample_size.min(100), d.outliers.evaluated_sample_size);
    }

    #[test]
    fn round_number_note_triggers() {
        let mut a = analyzer();
        for i in 1..=100 {
            a.process_value(&Cell::Integer(i * 5));
        }
        let report = a.finalize().unwrap();
        assert!(details(&report).patterns.round_numbers_note.is_some());
    }

    #[test]
    fn log_hint_requires_positive_wide_range() {
        let mut a = analyzer();
        for i in 1..=200 {
            a.process_value(&Cell::Float(f64::from(i) * 20.0));
        }
        let report = a.finalize().unwrap();
        assert!(details(&report).patterns.log_transform_hint.is_some());

        let mut b = analyzer();
        for i in -100..100 {
            b.process_value(&Cell::Float(f64::from(i) * 100.0));
        }
        let report = b.finalize().unwrap();
        assert!(details(&report).patterns.log_transform_hint.is_none());
    }

    #[test]
    fn histogram_bins_follow_sqrt_rule() {
        assert_eq!(histogram_bin_count(1), 1);
        assert_eq!(histogram_bin_count(4), 2);
        assert_eq!(histogram_bin_count(81), 9);
        assert_eq!(histogram_bin_count(10_000), 10);
    }

    #[test]
    fn disabled_tests_report_not_requested() {
        let options = AnalyzerOptions {
            normality_tests: vec!["jarque_bera".to_string()],
            outlier_methods: vec!["iqr".to_string()],
            ..AnalyzerOptions::default()
        };
        let mut a = NumericAnalyzer::new(
            "x",
            TypeDetectionResult::new(DataType::NumericalFloat, SemanticType::Unknown, 0.9),
            &options,
        );
        for i in 0..200 {
            a.process_value(&Cell::Float(f64::from(i)));
        }
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert_eq!(d.normality.shapiro_wilk.interpretation, "not requested");
        assert_ne!(d.normality.jarque_bera.interpretation, "not requested");
        assert_eq!(d.outliers.zscore_outliers, 0);
        assert_eq!(d.outliers.modified_zscore_outliers, 0);
    }
}
