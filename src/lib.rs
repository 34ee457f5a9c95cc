//! Streamscope: single-pass, memory-bounded exploratory data analysis over
//! tabular streams.
//!
//! ## Architecture
//!
//! - **Stats primitives**: Welford moments, P-squared quantiles, seeded
//!   reservoirs, online covariance, bounded frequency counters
//! - **Type detector**: sample-based per-column type and semantic inference
//! - **Univariate analyzers**: one bounded sketch set per column
//! - **Bivariate analyzer**: capped pairwise correlation / association /
//!   group-difference sketches
//! - **Orchestrator**: two-pass chunked pull loop with adaptive chunk
//!   sizing under an explicit memory budget
//!
//! Memory is O(columns + pairs) regardless of row count; the report has the
//! same shape for a thousand rows or a billion.

pub mod bivariate;
pub mod config;
pub mod detect;
pub mod engine;
pub mod kernels;
pub mod report;
pub mod sampler;
pub mod stats;
pub mod types;
pub mod univariate;

// Re-export the main entry points
pub use config::{AnalysisConfig, SampleMethod, SamplingOptions};
pub use engine::{CsvFileSource, EngineError, MemorySource, RowSource, StreamingOrchestrator};
pub use types::{Cell, DataType, EdaReport, ParsedRow, SemanticType, Warning};

// Re-export analyzer building blocks for embedders
pub use bivariate::BivariateAnalyzer;
pub use detect::TypeDetector;
pub use univariate::ColumnAnalyzer;
