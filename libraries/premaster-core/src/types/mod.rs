//! Domain types for premaster

mod audio;
mod metrics;
mod report;
mod scoring;

pub use audio::{AudioBuffer, SourceInfo, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
pub use metrics::{Band, BandCorrelations, DcOffset, LoudnessMethod, RawMetrics};
pub use report::{
    AnalysisReport, Confidence, MasteredFileVerdict, MasteredIndicator, PhaseCause, ProblemBand,
    RegionIssue, RegionMetric, Severity, StereoField, TemporalRegion, TemporalReport, Territory,
};
pub use scoring::{FinalScore, MetricKind, ScoredMetric, ScoringMode, Status};
