//! Two-pass streaming orchestrator.
//!
//! Pass 1 pulls a bounded prefix, fixes the header and per-column types, and
//! allocates the analyzers. Pass 2 re-opens the source and drives every row
//! through the per-column and per-pair sketches in adaptive chunks under an
//! explicit memory budget. Finalize assembles the composite report.
//!
//! The loop is single-threaded and cooperative: it suspends only on the
//! next-batch read, checks cancellation at batch boundaries, and never
//! yields inside a sketch update.

use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bivariate::BivariateAnalyzer;
use crate::config::AnalysisConfig;
use crate::detect::TypeDetector;
use crate::report::assemble;
use crate::sampler::{plan_sampling, SmartSampler};
use crate::types::{
    round2, BivariateReport, Cell, ColumnReport, DataType, EdaReport, ParsedRow,
    PerformanceMetrics, ReportMetadata, TypeDetectionResult, Warning, WarningSeverity,
};
use crate::univariate::{AnalyzerOptions, ColumnAnalyzer};

use super::memory::{MemoryAction, MemoryManager, ESTIMATED_BYTES_PER_CELL};
use super::progress::{ProgressCallback, ProgressReporter};
use super::source::RowSource;

/// Pass-1 prefix bounds.
const PREFIX_ROWS: usize = 1_000;
const DETECTION_VALUES_PER_COLUMN: usize = 500;
/// Batch size for the sampling collection pass.
const SAMPLING_BATCH: usize = 4_096;

/// Fatal engine errors. Everything row-, cell-, column-, or pair-local is
/// absorbed into report warnings instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("input source failed: {0}")]
    Source(#[from] anyhow::Error),
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct StreamingOrchestrator {
    config: AnalysisConfig,
    progress_callback: Option<ProgressCallback>,
    cancel: CancellationToken,
    /// Bounded row buffer for the downstream multivariate module.
    multivariate_rows: Vec<ParsedRow>,
}

impl StreamingOrchestrator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            progress_callback: None,
            cancel: CancellationToken::new(),
            multivariate_rows: Vec::new(),
        }
    }

    /// Attach a progress observer.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Attach a cancellation token; cancellation is observed at row-batch
    /// boundaries and produces a degraded (but complete-shaped) report.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Rows buffered for the downstream multivariate module, when enabled.
    pub fn take_multivariate_rows(&mut self) -> Vec<ParsedRow> {
        std::mem::take(&mut self.multivariate_rows)
    }

    /// Run the full two-pass analysis over a source.
    pub async fn run<S: RowSource>(&mut self, source: &mut S) -> Result<EdaReport, EngineError> {
        let started = Instant::now();
        let mut config = self.config.clone();
        let mut warnings = config.validate();
        let progress = ProgressReporter::new(
            self.progress_callback.take(),
            config.progress_every_chunks,
        );

        info!(source = source.source_name(), "starting streaming analysis");
        progress.phase("initializing", "reading type-detection prefix".to_string(), 1, 4);

        // ------------------------------------------------------------------
        // Pass 1: prefix, header, type detection, analyzer allocation
        // ------------------------------------------------------------------
        let prefix = self.read_prefix(source).await?;
        let Some(pass1) = build_pass1(&prefix, source.has_header()) else {
            warn!("input yielded no data rows; returning degraded report");
            warnings.push(
                Warning::error(
                    WarningSeverity::High,
                    "input yielded zero data rows (NoData); nothing was analyzed",
                )
                .with_impact("report sections are empty"),
            );
            return Ok(degraded_report(warnings, started, source.has_header()));
        };
        let Pass1 {
            headers,
            detections,
        } = pass1;

        let analyzer_options = AnalyzerOptions {
            categorical_cap: config.max_categorical_levels,
            outlier_methods: config.outlier_methods.clone(),
            normality_tests: config.normality_tests.clone(),
        };
        let mut analyzers: Vec<ColumnAnalyzer> = headers
            .iter()
            .zip(&detections)
            .map(|(name, det)| ColumnAnalyzer::for_detection(name, det, &analyzer_options))
            .collect();
        let column_types: Vec<(String, DataType)> = headers
            .iter()
            .cloned()
            .zip(detections.iter().map(|d| d.data_type))
            .collect();
        let mut bivariate = BivariateAnalyzer::new(&column_types, config.max_correlation_pairs);

        info!(
            columns = headers.len(),
            pairs = bivariate.pair_count(),
            "pass 1 complete: analyzers allocated"
        );

        // ------------------------------------------------------------------
        // Optional sampling pass
        // ------------------------------------------------------------------
        let avg_row_bytes = estimate_row_bytes(&prefix);
        let estimated_total_rows = source
            .size_hint_bytes()
            .map(|bytes| (bytes as f64 / avg_row_bytes.max(1.0)) as u64);
        let plan = plan_sampling(
            &config.sampling_options,
            source.size_hint_bytes(),
            estimated_total_rows,
            Some(avg_row_bytes),
            config.sampling_threshold,
        );

        let mut sampling_applied = false;
        let mut population_rows: u64 = 0;
        let sampled_rows: Option<Vec<ParsedRow>> = if let Some(plan) = plan {
            progress.phase("sampling", format!("collecting {} sample rows", plan.target), 2, 4);
            let (rows, observed) = self
                .collect_sample(source, plan, &headers, &mut warnings)
                .await?;
            sampling_applied = true;
            population_rows = observed;
            Some(rows)
        } else {
            None
        };

        // ------------------------------------------------------------------
        // Pass 2: chunked fan-out under the memory budget
        // ------------------------------------------------------------------
        progress.phase("analyzing", "streaming rows through analyzers".to_string(), 3, 4);
        let mut memory = MemoryManager::new(config.chunking.clone(), config.memory_threshold_mb);
        let mut state = Pass2State {
            rows_analyzed: 0,
            chunks_processed: 0,
            header_mismatches: 0,
            arity: headers.len(),
            row_cap: config.max_rows_analyzed,
            row_cap_hit: false,
            degraded: false,
            multivariate_cap: if config.enable_multivariate {
                config.max_collected_rows_multivariate
            } else {
                0
            },
        };

        match sampled_rows {
            Some(rows) => {
                self.drive_sampled(
                    &rows,
                    &mut analyzers,
                    &mut bivariate,
                    &mut memory,
                    &mut state,
                    &progress,
                );
            }
            None => {
                population_rows = self
                    .drive_stream(
                        source,
                        &mut analyzers,
                        &mut bivariate,
                        &mut memory,
                        &mut state,
                        &progress,
                    )
                    .await?;
            }
        }

        // ------------------------------------------------------------------
        // Finalize
        // ------------------------------------------------------------------
        progress.phase("finalizing", "assembling report".to_string(), 4, 4);

        if state.row_cap_hit {
            sampling_applied = true;
            warnings.push(
                Warning::performance(
                    WarningSeverity::Medium,
                    format!(
                        "row cap reached: analyzed the first {} rows (sampling applied)",
                        state.rows_analyzed
                    ),
                )
                .with_suggestion("raise maxRowsAnalyzed to scan the full input"),
            );
        }
        if state.header_mismatches > 0 {
            warnings.push(Warning::data(
                WarningSeverity::Low,
                format!(
                    "{} rows had a different cell count than the header; missing cells were treated as null",
                    state.header_mismatches
                ),
            ));
        }
        if memory.emergency_events() > 0 {
            warnings.push(
                Warning::performance(
                    WarningSeverity::High,
                    format!(
                        "memory pressure exceeded the emergency threshold {} time(s); chunk size was cut to the floor",
                        memory.emergency_events()
                    ),
                )
                .with_suggestion("raise memoryThresholdMB or reduce tracked pairs"),
            );
        }
        if state.degraded {
            warnings.push(
                Warning::error(
                    WarningSeverity::High,
                    "analysis was cancelled; the report covers only the rows processed before the stop",
                )
                .with_impact("statistics are partial"),
            );
        }

        let mut column_reports: Vec<ColumnReport> = Vec::with_capacity(analyzers.len());
        for analyzer in &mut analyzers {
            match analyzer.finalize() {
                Ok(report) => column_reports.push(report),
                Err(e) => warnings.push(Warning::error(
                    WarningSeverity::Medium,
                    format!("column finalize failed: {e}"),
                )),
            }
            warnings.extend(analyzer.warnings().iter().cloned());
        }
        let bivariate_report: BivariateReport = bivariate.finalize();
        warnings.extend(bivariate.warnings().iter().cloned());

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let avg_chunk_size = if state.chunks_processed == 0 {
            0.0
        } else {
            state.rows_analyzed as f64 / state.chunks_processed as f64
        };
        let performance = PerformanceMetrics {
            analysis_time_ms: elapsed_ms,
            rows_analyzed: state.rows_analyzed,
            chunks_processed: state.chunks_processed,
            peak_memory_mb: round2(memory.peak_mb()),
            avg_chunk_size: round2(avg_chunk_size),
            memory_efficiency: memory.efficiency_summary(state.rows_analyzed),
        };

        let approach = match (state.degraded, sampling_applied) {
            (true, _) => "single-pass streaming EDA (degraded: cancelled before completion)",
            (false, true) => "single-pass streaming EDA over a representative sample",
            (false, false) => "single-pass streaming EDA with bounded sketches",
        };
        let metadata = ReportMetadata {
            analysis_approach: approach.to_string(),
            dataset_size: population_rows.max(state.rows_analyzed),
            columns_analyzed: headers.len(),
            sampling_applied,
        };

        info!(
            rows = state.rows_analyzed,
            chunks = state.chunks_processed,
            elapsed_ms,
            peak_mb = memory.peak_mb(),
            "analysis complete"
        );

        Ok(assemble(
            column_reports,
            bivariate_report,
            warnings,
            performance,
            metadata,
            config.significance_level,
        ))
    }

    // ------------------------------------------------------------------
    // Pass 1 helpers
    // ------------------------------------------------------------------

    async fn read_prefix<S: RowSource>(
        &self,
        source: &mut S,
    ) -> Result<Vec<ParsedRow>, EngineError> {
        let mut prefix = Vec::with_capacity(PREFIX_ROWS);
        loop {
            let batch = source.next_batch(PREFIX_ROWS - prefix.len()).await?;
            prefix.extend(batch.rows);
            if batch.eof || prefix.len() >= PREFIX_ROWS {
                return Ok(prefix);
            }
        }
    }

    // ------------------------------------------------------------------
    // Sampling collection
    // ------------------------------------------------------------------

    async fn collect_sample<S: RowSource>(
        &self,
        source: &mut S,
        plan: crate::sampler::SamplePlan,
        headers: &[String],
        warnings: &mut Vec<Warning>,
    ) -> Result<(Vec<ParsedRow>, u64), EngineError> {
        source.reset().await?;
        let mut sampler = SmartSampler::new(plan, headers);
        let mut header_pending = source.has_header();
        let mut observed: u64 = 0;

        'outer: loop {
            // Biased so an observed cancel always wins over a ready batch.
            let batch = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break 'outer,
                result = source.next_batch(SAMPLING_BATCH) => result?,
            };
            for row in batch.rows {
                if header_pending {
                    header_pending = false;
                    continue;
                }
                observed += 1;
                sampler.observe(row);
                if sampler.is_satisfied() {
                    break 'outer;
                }
            }
            if batch.eof {
                break;
            }
        }

        let result = sampler.finish();
        warnings.extend(result.warnings);
        info!(
            sample_rows = result.rows.len(),
            population = observed,
            representative = result.quality.representative_score,
            convergence = result.quality.convergence_score,
            "sampling pass complete"
        );
        Ok((result.rows, observed))
    }

    // ------------------------------------------------------------------
    // Pass 2 drivers
    // ------------------------------------------------------------------

    /// Stream mode: re-open the source and pull batches at the adaptive
    /// chunk size. Returns total rows observed at the source.
    async fn drive_stream<S: RowSource>(
        &mut self,
        source: &mut S,
        analyzers: &mut [ColumnAnalyzer],
        bivariate: &mut BivariateAnalyzer,
        memory: &mut MemoryManager,
        state: &mut Pass2State,
        progress: &ProgressReporter,
    ) -> Result<u64, EngineError> {
        source.reset().await?;
        let mut header_pending = source.has_header();
        let mut observed: u64 = 0;

        loop {
            let chunk_size = memory.current_chunk_size();
            // Biased so an observed cancel always wins over a ready batch.
            let batch = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    state.degraded = true;
                    break;
                }
                result = source.next_batch(chunk_size) => result?,
            };

            let mut rows = batch.rows;
            if header_pending && !rows.is_empty() {
                rows.remove(0);
                header_pending = false;
            }
            observed += rows.len() as u64;

            if !rows.is_empty() {
                self.process_chunk(&rows, analyzers, bivariate, memory, state, progress);
            }
            if state.row_cap_hit || batch.eof {
                break;
            }
        }
        Ok(observed)
    }

    /// Sampled mode: the representative rows are already in memory; chunk
    /// them at the adaptive size with cancellation checks between chunks.
    fn drive_sampled(
        &mut self,
        rows: &[ParsedRow],
        analyzers: &mut [ColumnAnalyzer],
        bivariate: &mut BivariateAnalyzer,
        memory: &mut MemoryManager,
        state: &mut Pass2State,
        progress: &ProgressReporter,
    ) {
        let mut cursor = 0;
        while cursor < rows.len() {
            if self.cancel.is_cancelled() {
                state.degraded = true;
                break;
            }
            let end = (cursor + memory.current_chunk_size()).min(rows.len());
            self.process_chunk(&rows[cursor..end], analyzers, bivariate, memory, state, progress);
            cursor = end;
            if state.row_cap_hit {
                break;
            }
        }
    }

    /// Apply one chunk: per-column fan-out, per-pair fan-out, optional
    /// multivariate copy, then the memory callback.
    fn process_chunk(
        &mut self,
        rows: &[ParsedRow],
        analyzers: &mut [ColumnAnalyzer],
        bivariate: &mut BivariateAnalyzer,
        memory: &mut MemoryManager,
        state: &mut Pass2State,
        progress: &ProgressReporter,
    ) {
        for row in rows {
            if state.rows_analyzed >= state.row_cap {
                state.row_cap_hit = true;
                break;
            }
            if row.data.len() != state.arity {
                state.header_mismatches += 1;
            }
            for (i, analyzer) in analyzers.iter_mut().enumerate() {
                analyzer.process_value(row.cell(i));
            }
            bivariate.process_row(row);
            if self.multivariate_rows.len() < state.multivariate_cap {
                self.multivariate_rows.push(row.clone());
            }
            state.rows_analyzed += 1;
        }

        state.chunks_processed += 1;

        let estimate = analyzers
            .iter()
            .map(ColumnAnalyzer::estimated_bytes)
            .sum::<usize>()
            + bivariate.estimated_bytes()
            + rows.len() * state.arity.max(1) * ESTIMATED_BYTES_PER_CELL
            + self.multivariate_rows.len() * state.arity.max(1) * ESTIMATED_BYTES_PER_CELL;
        let action = memory.observe(estimate);
        if matches!(action, MemoryAction::Shrank | MemoryAction::Emergency) {
            for analyzer in analyzers.iter_mut() {
                analyzer.clear_transient_memory();
            }
        }

        progress.chunk(state.chunks_processed, state.rows_analyzed);
    }
}

// ============================================================================
// Internal state
// ============================================================================

struct Pass1 {
    headers: Vec<String>,
    detections: Vec<TypeDetectionResult>,
}

/// Fix the header list and detect per-column types from the prefix.
///
/// Returns `None` when no data rows exist (empty or header-only input).
fn build_pass1(prefix: &[ParsedRow], has_header: bool) -> Option<Pass1> {
    if prefix.is_empty() {
        return None;
    }

    let (headers, data_rows): (Vec<String>, &[ParsedRow]) = if has_header {
        let header_row = &prefix[0];
        let headers = header_row
            .data
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                cell.to_key()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| format!("Column_{}", i + 1))
            })
            .collect();
        (headers, &prefix[1..])
    } else {
        let arity = prefix[0].data.len();
        let headers = (1..=arity).map(|i| format!("Column_{i}")).collect();
        (headers, prefix)
    };

    if data_rows.is_empty() {
        return None;
    }

    let detector = TypeDetector::new();
    let detections: Vec<TypeDetectionResult> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<Cell> = data_rows
                .iter()
                .take(DETECTION_VALUES_PER_COLUMN)
                .map(|row| row.cell(i).clone())
                .collect();
            detector.detect(name, &values)
        })
        .collect();

    Some(Pass1 {
        headers,
        detections,
    })
}

struct Pass2State {
    rows_analyzed: u64,
    chunks_processed: u64,
    header_mismatches: u64,
    arity: usize,
    row_cap: u64,
    row_cap_hit: bool,
    degraded: bool,
    multivariate_cap: usize,
}

/// Average retained bytes per row, from the prefix sample.
fn estimate_row_bytes(prefix: &[ParsedRow]) -> f64 {
    if prefix.is_empty() {
        return 100.0;
    }
    let total: usize = prefix
        .iter()
        .map(|row| {
            row.raw.as_ref().map_or_else(
                || {
                    row.data
                        .iter()
                        .map(|c| match c {
                            Cell::Text(s) => s.len() + 8,
                            _ => 8,
                        })
                        .sum::<usize>()
                },
                String::len,
            )
        })
        .sum();
    (total as f64 / prefix.len() as f64).max(1.0)
}

/// Standard-shaped report for a run that could not analyze anything.
fn degraded_report(warnings: Vec<Warning>, started: Instant, had_header: bool) -> EdaReport {
    assemble(
        Vec::new(),
        BivariateReport::default(),
        warnings,
        PerformanceMetrics {
            analysis_time_ms: started.elapsed().as_millis() as u64,
            rows_analyzed: 0,
            chunks_processed: 0,
            peak_memory_mb: 0.0,
            avg_chunk_size: 0.0,
            memory_efficiency: "no rows were processed".to_string(),
        },
        ReportMetadata {
            analysis_approach: if had_header {
                "degraded: header-only input (NoData)".to_string()
            } else {
                "degraded: empty input (NoData)".to_string()
            },
            dataset_size: 0,
            columns_analyzed: 0,
            sampling_applied: false,
        },
        0.05,
    )
}
