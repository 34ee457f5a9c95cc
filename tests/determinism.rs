//! Determinism and equivalence properties.
//!
//! Seeded runs must reproduce byte-identical analysis sections; chunk size
//! must not change any reported statistic beyond floating-point tolerance;
//! quantile estimates must hit their accuracy target on synthetic streams;
//! and configurations must stay isolated between orchestrators in the same
//! process.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use streamscope::types::ColumnDetails;
use streamscope::{AnalysisConfig, MemorySource, StreamingOrchestrator};

async fn analyze(text: &str, config: AnalysisConfig) -> streamscope::EdaReport {
    let mut source = MemorySource::from_text(text, ',', true);
    let mut orchestrator = StreamingOrchestrator::new(config);
    orchestrator
        .run(&mut source)
        .await
        .expect("engine run failed")
}

/// Mixed-type fixture with enough rows to exercise every sketch.
fn fixture(rows: usize) -> String {
    let mut text = String::from("amount,segment,flag\n");
    for i in 0..rows {
        let amount = ((i * 37) % 1000) as f64 / 10.0;
        let segment = ["retail", "wholesale", "online"][i % 3];
        let flag = if i % 5 == 0 { "yes" } else { "no" };
        text.push_str(&format!("{amount},{segment},{flag}\n"));
    }
    text
}

#[tokio::test]
async fn identical_runs_produce_identical_analysis_sections() {
    let text = fixture(5_000);
    let first = analyze(&text, AnalysisConfig::default()).await;
    let second = analyze(&text, AnalysisConfig::default()).await;

    let a = serde_json::to_value(&first.eda_analysis).unwrap();
    let b = serde_json::to_value(&second.eda_analysis).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn chunk_size_does_not_change_the_report() {
    let text = fixture(8_000);

    let mut small = AnalysisConfig::default();
    small.chunking.chunk_size = 100;
    small.chunking.adaptive_chunk_sizing = false;

    let mut large = AnalysisConfig::default();
    large.chunking.chunk_size = 10_000;
    large.chunking.adaptive_chunk_sizing = false;

    let report_small = analyze(&text, small).await;
    let report_large = analyze(&text, large).await;

    // Chunking is invisible to the statistics: the only allowed differences
    // are in performance counters.
    let a = serde_json::to_value(&report_small.eda_analysis).unwrap();
    let b = serde_json::to_value(&report_large.eda_analysis).unwrap();
    assert_eq!(a, b);
    assert!(
        report_small.performance_metrics.chunks_processed
            > report_large.performance_metrics.chunks_processed
    );
}

#[tokio::test]
async fn p2_quantiles_track_a_normal_stream() {
    // Deterministic N(50, 10) stream through the full engine.
    let normal = Normal::new(50.0, 10.0).unwrap();
    let mut rng = StdRng::seed_from_u64(1234);
    let mut text = String::from("reading\n");
    for _ in 0..20_000 {
        text.push_str(&format!("{:.4}\n", normal.sample(&mut rng)));
    }

    let report = analyze(&text, AnalysisConfig::default()).await;
    let column = &report.eda_analysis.univariate_analysis[0];
    let ColumnDetails::Numeric(details) = &column.details else {
        panic!("expected numeric details");
    };

    // True quantiles of N(50, 10): p25 = 43.26, median = 50, p75 = 56.74.
    assert!((details.descriptives.median - 50.0).abs() < 0.5);
    assert!((details.quantiles.p25 - 43.26).abs() < 1.0);
    assert!((details.quantiles.p75 - 56.74).abs() < 1.0);
    assert!((details.quantiles.p95 - 66.45).abs() < 1.5);
    assert!(details.quantiles.p25 <= details.descriptives.median);
    assert!(details.descriptives.median <= details.quantiles.p75);

    // Moments agree with the generator parameters.
    assert!((details.descriptives.mean - 50.0).abs() < 0.5);
    assert!((details.descriptives.std_dev - 10.0).abs() < 0.5);
    // And the normality suite should not reject its own distribution.
    assert!(details.normality.shapiro_wilk.p_value >= 0.05);
}

#[tokio::test]
async fn distinct_configs_coexist_in_one_process() {
    let text = fixture(2_000);

    let mut capped = AnalysisConfig::default();
    capped.max_rows_analyzed = 500;

    // Run interleaved construction to catch any hidden shared state.
    let full_report = analyze(&text, AnalysisConfig::default()).await;
    let capped_report = analyze(&text, capped).await;
    let full_again = analyze(&text, AnalysisConfig::default()).await;

    assert_eq!(full_report.performance_metrics.rows_analyzed, 2_000);
    assert_eq!(capped_report.performance_metrics.rows_analyzed, 500);
    assert_eq!(full_again.performance_metrics.rows_analyzed, 2_000);
    assert!(capped_report.metadata.sampling_applied);
    assert!(!full_report.metadata.sampling_applied);
}

#[tokio::test]
async fn valid_plus_null_equals_total_for_every_column() {
    let text = "a,b,c\n1,x,\n,y,2023-01-01\n3,,2023-01-02\nnot_a_number,z,bad_date\n";
    let report = analyze(text, AnalysisConfig::default()).await;

    for column in &report.eda_analysis.univariate_analysis {
        assert_eq!(
            column.valid_count + column.null_count,
            column.total_count,
            "count invariant broken for {}",
            column.name
        );
    }
}
