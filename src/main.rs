//! Streamscope CLI: run the streaming EDA engine over a delimited file and
//! print the JSON report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use streamscope::config::SampleMethod;
use streamscope::{AnalysisConfig, CsvFileSource, StreamingOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "streamscope", about = "Streaming EDA over tabular data", version)]
struct Args {
    /// Input file (UTF-8 delimited text)
    input: PathBuf,

    /// Field delimiter
    #[arg(short, long, default_value = ",")]
    delimiter: char,

    /// Treat the first row as data, not a header
    #[arg(long)]
    no_header: bool,

    /// Analysis configuration TOML (defaults apply when omitted)
    #[arg(short, long, env = "STREAMSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Hard cap on analyzed rows
    #[arg(long)]
    max_rows: Option<u64>,

    /// Sample this many rows instead of scanning the whole file
    #[arg(long)]
    sample_rows: Option<u64>,

    /// Sampling method: random, stratified, systematic, head
    #[arg(long)]
    sample_method: Option<String>,

    /// Stratification column for stratified sampling
    #[arg(long)]
    stratify_by: Option<String>,

    /// Seed for deterministic sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = AnalysisConfig::load(args.config.as_deref());

    if let Some(max_rows) = args.max_rows {
        config.max_rows_analyzed = max_rows;
    }
    if let Some(rows) = args.sample_rows {
        config.sampling_options.sample_rows = Some(rows);
    }
    if let Some(method) = args.sample_method.as_deref() {
        config.sampling_options.sample_method = Some(parse_method(method)?);
    }
    if args.stratify_by.is_some() {
        config.sampling_options.stratify_by = args.stratify_by.clone();
    }
    if args.seed.is_some() {
        config.sampling_options.seed = args.seed;
    }

    info!(input = %args.input.display(), "analyzing");
    let mut source = CsvFileSource::open(&args.input, args.delimiter, !args.no_header)
        .await
        .context("failed to open input")?;

    let mut orchestrator = StreamingOrchestrator::new(config);
    let report = orchestrator.run(&mut source).await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

fn parse_method(raw: &str) -> Result<SampleMethod> {
    match raw.to_lowercase().as_str() {
        "random" => Ok(SampleMethod::Random),
        "stratified" => Ok(SampleMethod::Stratified),
        "systematic" => Ok(SampleMethod::Systematic),
        "head" => Ok(SampleMethod::Head),
        other => anyhow::bail!("unknown sample method '{other}'"),
    }
}
