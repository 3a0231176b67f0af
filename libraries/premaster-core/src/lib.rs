//! premaster core
//!
//! Data model shared by the premaster analysis engine and its front ends.
//!
//! This crate only describes values; it does not measure anything:
//! - **Input**: [`AudioBuffer`] (channel-major f64 samples) and [`SourceInfo`]
//!   (provenance of the file the buffer was decoded from)
//! - **Measurements**: [`RawMetrics`], one record per analysis pass
//! - **Verdicts**: [`ScoredMetric`], [`FinalScore`], [`TemporalRegion`],
//!   [`MasteredFileVerdict`], gathered into an [`AnalysisReport`]
//! - **Output hygiene**: the [`Sanitize`] trait, which replaces non-finite
//!   floats with fixed sentinels before a report leaves the engine
//!
//! # Example
//!
//! ```rust
//! use premaster_core::AudioBuffer;
//!
//! let left = vec![0.0, 0.5, -0.5, 0.25];
//! let right = vec![0.0, 0.4, -0.4, 0.2];
//! let buffer = AudioBuffer::new(vec![left, right], 44_100).unwrap();
//!
//! assert_eq!(buffer.num_channels(), 2);
//! assert_eq!(buffer.frames(), 4);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod sanitize;
pub mod types;

pub use error::{CoreError, Result};
pub use sanitize::{sanitize_f64, Sanitize};
pub use types::{
    // Input
    AudioBuffer, SourceInfo,
    // Measurements
    Band, BandCorrelations, DcOffset, LoudnessMethod, RawMetrics,
    // Scoring
    FinalScore, MetricKind, ScoredMetric, ScoringMode, Status,
    // Report
    AnalysisReport, Confidence, MasteredFileVerdict, MasteredIndicator, PhaseCause, ProblemBand,
    RegionIssue, RegionMetric, Severity, StereoField, TemporalRegion, TemporalReport, Territory,
};
