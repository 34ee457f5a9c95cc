//! Analysis configuration.
//!
//! All knobs live in one serde-deserializable tree loaded from TOML (an
//! explicit path or `STREAMSCOPE_CONFIG`), with every field defaulted so a
//! missing file or missing key is never an error. Unknown keys are ignored.
//! The loaded config is passed into the orchestrator by value; nothing here
//! is process-global, so tests construct as many distinct configurations in
//! one process as they need.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Warning, WarningSeverity};

// ============================================================================
// Chunk sizing & memory policy
// ============================================================================

/// Adaptive chunk sizing policy, expressed as fractions of the current size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkPolicy {
    /// Starting chunk size in rows.
    pub chunk_size: usize,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    /// Shrink multiplier applied under memory pressure, in (0, 1).
    pub reduction_factor: f64,
    /// Growth multiplier applied when memory is comfortable, > 1.
    pub expansion_factor: f64,
    /// Memory above `emergency_threshold_multiplier * threshold` trips the
    /// hard brake.
    pub emergency_threshold_multiplier: f64,
    pub adaptive_chunk_sizing: bool,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            min_chunk_size: 100,
            max_chunk_size: 100_000,
            reduction_factor: 0.5,
            expansion_factor: 1.5,
            emergency_threshold_multiplier: 2.0,
            adaptive_chunk_sizing: true,
        }
    }
}

// ============================================================================
// Sampling options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleMethod {
    Random,
    Stratified,
    Systematic,
    Head,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingOptions {
    /// Allow the sampler to kick in on its own for very large inputs.
    pub auto_sample: bool,
    pub sample_percentage: Option<f64>,
    pub sample_rows: Option<u64>,
    pub sample_size_bytes: Option<u64>,
    pub sample_method: Option<SampleMethod>,
    /// Column used to stratify; invalid names downgrade to random sampling.
    pub stratify_by: Option<String>,
    pub seed: Option<u64>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            auto_sample: true,
            sample_percentage: None,
            sample_rows: None,
            sample_size_bytes: None,
            sample_method: None,
            stratify_by: None,
            seed: None,
        }
    }
}

impl SamplingOptions {
    /// Whether any sampling knob was set explicitly.
    pub fn any_explicit(&self) -> bool {
        self.sample_percentage.is_some()
            || self.sample_rows.is_some()
            || self.sample_size_bytes.is_some()
            || self.sample_method.is_some()
    }
}

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    #[serde(flatten)]
    pub chunking: ChunkPolicy,

    /// Memory budget driving adaptive chunk sizing, in MB.
    #[serde(rename = "memoryThresholdMB")]
    pub memory_threshold_mb: f64,
    /// Accepted for compatibility; only triggers transient-cache drops.
    /// The engine budgets memory explicitly and never probes a collector.
    pub force_garbage_collection: bool,

    /// Hard row cap; reaching it stops the pass with a sampling warning.
    pub max_rows_analyzed: u64,
    /// Cap on tracked bivariate pairs.
    pub max_correlation_pairs: usize,
    /// Cap on retained categorical levels per column.
    pub max_categorical_levels: usize,
    /// Input size (bytes) above which auto-sampling engages.
    pub sampling_threshold: u64,
    pub significance_level: f64,
    pub outlier_methods: Vec<String>,
    pub normality_tests: Vec<String>,

    /// Buffer rows for the downstream multivariate module.
    pub enable_multivariate: bool,
    pub max_collected_rows_multivariate: usize,

    pub sampling_options: SamplingOptions,

    /// Emit a progress callback every N chunks.
    pub progress_every_chunks: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkPolicy::default(),
            memory_threshold_mb: 256.0,
            force_garbage_collection: false,
            max_rows_analyzed: 10_000_000,
            max_correlation_pairs: 50,
            max_categorical_levels: 500,
            sampling_threshold: 1 << 30,
            significance_level: 0.05,
            outlier_methods: vec![
                "iqr".to_string(),
                "zscore".to_string(),
                "modified_zscore".to_string(),
            ],
            normality_tests: vec![
                "shapiro_wilk".to_string(),
                "jarque_bera".to_string(),
                "kolmogorov_smirnov".to_string(),
            ],
            enable_multivariate: false,
            max_collected_rows_multivariate: 10_000,
            sampling_options: SamplingOptions::default(),
            progress_every_chunks: 10,
        }
    }
}

impl AnalysisConfig {
    /// Load from an explicit path, else `$STREAMSCOPE_CONFIG`, else defaults.
    pub fn load(explicit_path: Option<&Path>) -> Self {
        if let Some(path) = explicit_path {
            match Self::load_from_file(path) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded analysis config");
                    return config;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    return Self::default();
                }
            }
        }

        if let Ok(env_path) = std::env::var("STREAMSCOPE_CONFIG") {
            let p = PathBuf::from(&env_path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "loaded analysis config from STREAMSCOPE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "failed to load config from STREAMSCOPE_CONFIG, using defaults");
                    }
                }
            } else {
                warn!(path = %env_path, "STREAMSCOPE_CONFIG points to a non-existent file, using defaults");
            }
        }

        Self::default()
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Clamp out-of-range values back to safe defaults, one warning each.
    ///
    /// Invalid configuration never aborts a run; every downgrade is
    /// recorded for the report.
    pub fn validate(&mut self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let defaults = ChunkPolicy::default();

        if self.chunking.chunk_size == 0 {
            warnings.push(config_warning("chunkSize must be positive; using default"));
            self.chunking.chunk_size = defaults.chunk_size;
        }
        if self.chunking.min_chunk_size == 0 {
            warnings.push(config_warning("minChunkSize must be positive; using default"));
            self.chunking.min_chunk_size = defaults.min_chunk_size;
        }
        if self.chunking.max_chunk_size < self.chunking.min_chunk_size {
            warnings.push(config_warning(
                "maxChunkSize below minChunkSize; using defaults for both",
            ));
            self.chunking.min_chunk_size = defaults.min_chunk_size;
            self.chunking.max_chunk_size = defaults.max_chunk_size;
        }
        if !(0.0..1.0).contains(&self.chunking.reduction_factor)
            || self.chunking.reduction_factor == 0.0
        {
            warnings.push(config_warning("reductionFactor must be in (0, 1); using default"));
            self.chunking.reduction_factor = defaults.reduction_factor;
        }
        if self.chunking.expansion_factor <= 1.0 {
            warnings.push(config_warning("expansionFactor must exceed 1; using default"));
            self.chunking.expansion_factor = defaults.expansion_factor;
        }
        if self.chunking.emergency_threshold_multiplier <= 1.0 {
            warnings.push(config_warning(
                "emergencyThresholdMultiplier must exceed 1; using default",
            ));
            self.chunking.emergency_threshold_multiplier =
                defaults.emergency_threshold_multiplier;
        }
        if self.memory_threshold_mb <= 0.0 {
            warnings.push(config_warning("memoryThresholdMB must be positive; using default"));
            self.memory_threshold_mb = 256.0;
        }
        if self.max_correlation_pairs == 0 {
            warnings.push(config_warning("maxCorrelationPairs must be positive; using 50"));
            self.max_correlation_pairs = 50;
        }
        if self.max_categorical_levels == 0 {
            warnings.push(config_warning("maxCategoricalLevels must be positive; using 500"));
            self.max_categorical_levels = 500;
        }
        if let Some(pct) = self.sampling_options.sample_percentage {
            if !(0.0..=100.0).contains(&pct) || pct == 0.0 {
                warnings.push(config_warning(
                    "samplePercentage must be in (0, 100]; ignoring it",
                ));
                self.sampling_options.sample_percentage = None;
            }
        }
        warnings
    }
}

fn config_warning(message: &str) -> Warning {
    Warning::error(WarningSeverity::Low, message.to_string())
        .with_suggestion("fix the configuration value to silence this warning")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut config = AnalysisConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.chunking.chunk_size, 1_000);
        assert_eq!(config.max_correlation_pairs, 50);
        assert_eq!(config.max_categorical_levels, 500);
    }

    #[test]
    fn camel_case_keys_parse_and_unknown_keys_are_ignored() {
        let raw = r#"
            chunkSize = 5000
            memoryThresholdMB = 128.0
            maxCorrelationPairs = 10
            someFutureOption = "ignored"

            [samplingOptions]
            sampleRows = 50000
            sampleMethod = "stratified"
            stratifyBy = "region"
            seed = 7
        "#;
        let config: AnalysisConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.chunking.chunk_size, 5000);
        assert_eq!(config.memory_threshold_mb, 128.0);
        assert_eq!(config.max_correlation_pairs, 10);
        assert_eq!(config.sampling_options.sample_rows, Some(50_000));
        assert_eq!(
            config.sampling_options.sample_method,
            Some(SampleMethod::Stratified)
        );
        assert_eq!(config.sampling_options.seed, Some(7));
    }

    #[test]
    fn invalid_values_downgrade_with_warnings() {
        let mut config = AnalysisConfig::default();
        config.chunking.chunk_size = 0;
        config.chunking.reduction_factor = 1.5;
        config.memory_threshold_mb = -1.0;
        config.sampling_options.sample_percentage = Some(250.0);

        let warnings = config.validate();
        assert_eq!(warnings.len(), 4);
        assert_eq!(config.chunking.chunk_size, 1_000);
        assert_eq!(config.chunking.reduction_factor, 0.5);
        assert_eq!(config.memory_threshold_mb, 256.0);
        assert_eq!(config.sampling_options.sample_percentage, None);
    }

    #[test]
    fn explicit_sampling_flags_are_detected() {
        let mut options = SamplingOptions::default();
        assert!(!options.any_explicit());
        options.sample_rows = Some(100);
        assert!(options.any_explicit());
    }
}
