//! Datetime column analyzer: span, granularity, calendar breakdowns, and
//! temporal-pattern classification.

use chrono::{Datelike, NaiveDateTime, Timelike, Utc};

use crate::detect::{parse_datetime_lenient, MAX_YEAR, MIN_YEAR};
use crate::stats::{BoundedFrequencyCounter, Reservoir};
use crate::types::{
    round2, round4, CalendarBucket, Cell, ColumnDetails, ColumnReport, DateTimeDetails,
    TypeDetectionResult, Warning,
};

use super::{AnalyzerError, ColumnCounts, UNIVARIATE_SEED};

/// Bounded sample of parsed timestamps used for gap analysis.
const TIMESTAMP_SAMPLE_CAP: usize = 50;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

#[derive(Debug)]
pub struct DateTimeAnalyzer {
    name: String,
    detection: TypeDetectionResult,
    counts: ColumnCounts,
    /// Unix seconds of a bounded sample, for inter-sample gaps.
    sample: Reservoir<i64>,
    years: BoundedFrequencyCounter<i32>,
    months: BoundedFrequencyCounter<u32>,
    weekdays: BoundedFrequencyCounter<u32>,
    hours: BoundedFrequencyCounter<u32>,
    earliest: Option<NaiveDateTime>,
    latest: Option<NaiveDateTime>,
    has_nonzero_second: bool,
    has_nonzero_minute: bool,
    has_nonzero_hour: bool,
    future_count: u64,
    out_of_range_count: u64,
    mismatches: u64,
    warnings: Vec<Warning>,
    finalized: bool,
}

impl DateTimeAnalyzer {
    pub fn new(name: &str, detection: TypeDetectionResult) -> Self {
        Self {
            name: name.to_string(),
            detection,
            counts: ColumnCounts::default(),
            sample: Reservoir::with_seed(TIMESTAMP_SAMPLE_CAP, UNIVARIATE_SEED),
            years: BoundedFrequencyCounter::new((MAX_YEAR - MIN_YEAR + 1) as usize),
            months: BoundedFrequencyCounter::new(12),
            weekdays: BoundedFrequencyCounter::new(7),
            hours: BoundedFrequencyCounter::new(24),
            earliest: None,
            latest: None,
            has_nonzero_second: false,
            has_nonzero_minute: false,
            has_nonzero_hour: false,
            future_count: 0,
            out_of_range_count: 0,
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
        let Some(dt) = parse_datetime_lenient(&raw) else {
            self.counts.record_null();
            self.mismatches += 1;
            return;
        };
        if !(MIN_YEAR..=MAX_YEAR).contains(&dt.year()) {
            self.counts.record_null();
            self.out_of_range_count += 1;
            return;
        }

        self.counts.record_valid();
        self.sample.update(dt.and_utc().timestamp());
        self.years.update(dt.year());
        self.months.update(dt.month());
        self.weekdays.update(dt.weekday().num_days_from_monday());
        self.hours.update(dt.hour());

        if dt.second() != 0 {
            self.has_nonzero_second = true;
        }
        if dt.minute() != 0 {
            self.has_nonzero_minute = true;
        }
        if dt.hour() != 0 {
            self.has_nonzero_hour = true;
        }
        if dt.and_utc() > Utc::now() {
            self.future_count += 1;
        }

        if self.earliest.map_or(true, |e| dt < e) {
            self.earliest = Some(dt);
        }
        if self.latest.map_or(true, |l| dt > l) {
            self.latest = Some(dt);
        }
    }

    pub fn finalize(&mut self) -> Result<ColumnReport, AnalyzerError> {
        if self.finalized {
            return Err(AnalyzerError::AlreadyFinalized(self.name.clone()));
        }
        self.finalized = true;
        self.warnings
            .extend(self.counts.standard_warnings(&self.name, self.mismatches));

        let details = match (self.earliest, self.latest) {
            (Some(earliest), Some(latest)) if self.counts.valid > 0 => {
                ColumnDetails::DateTime(self.build_details(earliest, latest))
            }
            _ => ColumnDetails::Empty,
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

    fn build_details(&self, earliest: NaiveDateTime, latest: NaiveDateTime) -> DateTimeDetails {
        let span_seconds = (latest.and_utc().timestamp() - earliest.and_utc().timestamp()) as f64;
        let span_days = span_seconds / 86_400.0;

        let granularity = if self.has_nonzero_second {
            "Second"
        } else if self.has_nonzero_minute {
            "Minute"
        } else if self.has_nonzero_hour {
            "Hour"
        } else {
            "Day"
        };

        // Mean inter-sample interval over the whole stream drives the
        // pattern class; the largest gap comes from the bounded sample.
        let mean_interval_days = if self.counts.valid > 1 {
            span_days / (self.counts.valid - 1) as f64
        } else {
            0.0
        };
        let temporal_pattern = if self.counts.valid < 2 {
            "single observation"
        } else if mean_interval_days < 1.0 {
            "high-frequency (sub-daily intervals)"
        } else if mean_interval_days < 7.0 {
            "daily-to-weekly cadence"
        } else if mean_interval_days < 32.0 {
            "weekly-to-monthly cadence"
        } else {
            "sparse (greater than monthly intervals)"
        };

        let mut sample_secs: Vec<i64> = self.sample.sample().to_vec();
        sample_secs.sort_unstable();
        let largest_gap_days = sample_secs
            .windows(2)
            .map(|w| (w[1] - w[0]) as f64 / 86_400.0)
            .fold(0.0, f64::max);

        let mut validity_notes = Vec::new();
        if self.future_count > 0 {
            validity_notes.push(format!("{} timestamps lie in the future", self.future_count));
        }
        if self.out_of_range_count > 0 {
            validity_notes.push(format!(
                "{} values parsed to years outside {MIN_YEAR}-{MAX_YEAR} and were dropped",
                self.out_of_range_count
            ));
        }

        DateTimeDetails {
            earliest: earliest.format("%Y-%m-%dT%H:%M:%S").to_string(),
            latest: latest.format("%Y-%m-%dT%H:%M:%S").to_string(),
            span_days: round2(span_days),
            span_months: round2(span_days / 30.44),
            span_years: round4(span_days / 365.25),
            granularity: granularity.to_string(),
            top_years: top_buckets(&self.years, |y| y.to_string()),
            top_months: top_buckets(&self.months, |m| {
                MONTH_NAMES[(*m as usize - 1).min(11)].to_string()
            }),
            top_weekdays: top_buckets(&self.weekdays, |d| {
                WEEKDAY_NAMES[(*d as usize).min(6)].to_string()
            }),
            top_hours: top_buckets(&self.hours, |h| format!("{h:02}:00")),
            temporal_pattern: temporal_pattern.to_string(),
            largest_gap_days: round2(largest_gap_days),
            validity_notes,
        }
    }

    pub fn clear_transient_memory(&mut self) {
        self.warnings.shrink_to_fit();
    }

    pub fn estimated_bytes(&self) -> usize {
        self.sample.estimated_bytes()
            + self.years.estimated_bytes(|_| 4)
            + self.months.estimated_bytes(|_| 4)
            + self.weekdays.estimated_bytes(|_| 4)
            + self.hours.estimated_bytes(|_| 4)
            + std::mem::size_of::<Self>()
    }
}

/// Top-3 calendar buckets in descending count order.
fn top_buckets<K: Eq + std::hash::Hash + Clone>(
    counter: &BoundedFrequencyCounter<K>,
    label: impl Fn(&K) -> String,
) -> Vec<CalendarBucket> {
    counter
        .top_k(3)
        .into_iter()
        .map(|(key, count)| CalendarBucket {
            label: label(&key),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, SemanticType};

    fn analyzer() -> DateTimeAnalyzer {
        DateTimeAnalyzer::new(
            "created",
            TypeDetectionResult::new(DataType::DateTime, SemanticType::Unknown, 0.9),
        )
    }

    fn details(report: &ColumnReport) -> &DateTimeDetails {
        match &report.details {
            ColumnDetails::DateTime(d) => d,
            other => panic!("expected datetime details, got {other:?}"),
        }
    }

    fn feed(a: &mut DateTimeAnalyzer, values: &[&str]) {
        for v in values {
            a.process_value(&Cell::Text((*v).to_string()));
        }
    }

    #[test]
    fn span_and_granularity_day_level() {
        let mut a = analyzer();
        feed(&mut a, &["2023-01-01", "2023-01-11", "2023-01-21", "2023-01-31"]);
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert_eq!(d.granularity, "Day");
        assert!((d.span_days - 30.0).abs() < 1e-9);
        assert_eq!(d.temporal_pattern, "weekly-to-monthly cadence");
    }

    #[test]
    fn nonzero_seconds_bump_granularity() {
        let mut a = analyzer();
        feed(&mut a, &["2023-01-01 10:00:05", "2023-01-02 11:00:00"]);
        let report = a.finalize().unwrap();
        assert_eq!(details(&report).granularity, "Second");
    }

    #[test]
    fn hour_granularity_without_minutes() {
        let mut a = analyzer();
        feed(&mut a, &["2023-01-01 10:00:00", "2023-01-02 14:00:00"]);
        let report = a.finalize().unwrap();
        assert_eq!(details(&report).granularity, "Hour");
    }

    #[test]
    fn out_of_range_years_recorded_in_validity_notes() {
        let mut a = analyzer();
        feed(
            &mut a,
            &["2023-05-01", "2023-05-02", "1776-07-04", "2023-05-03"],
        );
        let report = a.finalize().unwrap();
        assert_eq!(report.valid_count, 3);
        assert_eq!(report.null_count, 1);
        let d = details(&report);
        assert!(d
            .validity_notes
            .iter()
            .any(|n| n.contains("outside 1900-2100")));
    }

    #[test]
    fn top_buckets_are_populated() {
        let mut a = analyzer();
        feed(
            &mut a,
            &[
                "2021-06-01",
                "2021-06-15",
                "2021-07-01",
                "2022-06-01",
                "2021-06-20",
            ],
        );
        let report = a.finalize().unwrap();
        let d = details(&report);
        assert_eq!(d.top_years[0].label, "2021");
        assert_eq!(d.top_years[0].count, 4);
        assert_eq!(d.top_months[0].label, "June");
    }

    #[test]
    fn unparseable_values_count_as_null() {
        let mut a = analyzer();
        feed(&mut a, &["2023-01-01", "not a date", "2023-01-02"]);
        let report = a.finalize().unwrap();
        assert_eq!(report.valid_count, 2);
        assert_eq!(report.null_count, 1);
    }
}
