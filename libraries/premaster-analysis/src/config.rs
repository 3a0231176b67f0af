/// Analysis configuration
use crate::error::{AnalysisError, Result};
use crate::level::auto_oversample_factor;
use crate::loudness::MeterBackend;
use crate::stereo::DEFAULT_PROBLEM_BAND_THRESHOLD;
use premaster_core::ScoringMode;
use serde::{Deserialize, Serialize};

/// Oversampling factors the true-peak estimator supports
pub const SUPPORTED_OVERSAMPLE_FACTORS: [usize; 3] = [1, 2, 4];

/// Settings for a [`MixAnalyzer`](crate::MixAnalyzer)
///
/// Every field has a default, so a partial TOML/JSON document deserializes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Threshold tables to score against
    #[serde(default)]
    pub mode: ScoringMode,

    /// Chunk length for chunked analysis, in seconds
    #[serde(default = "default_chunk_seconds")]
    pub chunk_seconds: f64,

    /// Files longer than this are analysed chunked by `analyze_auto`
    #[serde(default = "default_chunk_threshold_seconds")]
    pub chunk_threshold_seconds: f64,

    /// Window length for temporal detection, in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,

    /// True-peak oversampling; `None` picks by sample rate
    #[serde(default)]
    pub oversample_factor: Option<usize>,

    /// Loudness backend, resolved once at startup
    #[serde(default = "MeterBackend::detect")]
    pub meter: MeterBackend,

    /// Correlation below which a band is reported as a problem
    #[serde(default = "default_problem_band_threshold")]
    pub problem_band_threshold: f64,
}

impl AnalysisConfig {
    /// Default configuration with the given scoring mode
    pub fn with_mode(mode: ScoringMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Oversampling factor to use at a sample rate
    pub fn oversample_factor_for(&self, sample_rate: u32) -> usize {
        self.oversample_factor
            .unwrap_or_else(|| auto_oversample_factor(sample_rate))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("chunk_seconds", self.chunk_seconds),
            ("chunk_threshold_seconds", self.chunk_threshold_seconds),
            ("window_seconds", self.window_seconds),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if let Some(factor) = self.oversample_factor {
            if !SUPPORTED_OVERSAMPLE_FACTORS.contains(&factor) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "oversample_factor must be 1, 2 or 4, got {}",
                    factor
                )));
            }
        }

        // Temporal windows must line up with chunk boundaries
        let windows_per_chunk = self.chunk_seconds / self.window_seconds;
        if (windows_per_chunk - windows_per_chunk.round()).abs() > 1e-9 || windows_per_chunk < 1.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "chunk_seconds ({}) must be a whole multiple of window_seconds ({})",
                self.chunk_seconds, self.window_seconds
            )));
        }

        if !self.problem_band_threshold.is_finite()
            || !(-1.0..=1.0).contains(&self.problem_band_threshold)
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "problem_band_threshold must be within [-1, 1], got {}",
                self.problem_band_threshold
            )));
        }

        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::default(),
            chunk_seconds: default_chunk_seconds(),
            chunk_threshold_seconds: default_chunk_threshold_seconds(),
            window_seconds: default_window_seconds(),
            oversample_factor: None,
            meter: MeterBackend::detect(),
            problem_band_threshold: default_problem_band_threshold(),
        }
    }
}

// Default values
fn default_chunk_seconds() -> f64 {
    5.0
}

fn default_chunk_threshold_seconds() -> f64 {
    60.0
}

fn default_window_seconds() -> f64 {
    1.0
}

fn default_problem_band_threshold() -> f64 {
    DEFAULT_PROBLEM_BAND_THRESHOLD
}
