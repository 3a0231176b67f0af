//! Error types for mix analysis

use premaster_core::CoreError;
use thiserror::Error;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can stop an analysis
///
/// Individual metrics never fail: unmeasurable values come back as `None`
/// and degenerate arithmetic is floored. These errors cover malformed input
/// and configuration only.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid buffer
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Chunked analysis was given no chunks
    #[error("No chunks provided for analysis")]
    NoChunks,

    /// Chunks of one file disagree on sample rate
    #[error("Chunk sample rate {found} Hz does not match {expected} Hz")]
    SampleRateMismatch {
        /// Sample rate of the first chunk
        expected: u32,
        /// Sample rate of the offending chunk
        found: u32,
    },

    /// Chunks of one file disagree on channel count
    #[error("Chunk has {found} channels, expected {expected}")]
    ChannelCountMismatch {
        /// Channel count of the first chunk
        expected: usize,
        /// Channel count of the offending chunk
        found: usize,
    },

    /// Configuration rejected by `AnalysisConfig::validate`
    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),
}
