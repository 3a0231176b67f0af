//! Mastering-readiness analysis
//!
//! This crate measures a mixed track and scores how ready it is for
//! mastering:
//! - Level: sample peak, true peak (polyphase oversampling), crest factor,
//!   DC offset, clipping
//! - Loudness: EBU R128 integrated LUFS with reliability gating and an RMS
//!   fallback, peak-to-loudness ratio
//! - Stereo: full-band and per-band correlation, mid/side ratio, L/R
//!   balance, mono/pseudo-stereo detection
//! - Verdicts: threshold scoring (normal/strict), score floor, territory and
//!   mastered-file classification, temporal problem regions
//!
//! Long files can be analysed in chunks; chunk results reduce to the same
//! report shape and, within floating-point tolerance, the same numbers as a
//! single pass.
//!
//! # Example
//!
//! ```ignore
//! use premaster_analysis::{AnalysisConfig, MixAnalyzer};
//! use premaster_core::SourceInfo;
//!
//! let analyzer = MixAnalyzer::new(AnalysisConfig::default())?;
//! let report = analyzer.analyze_auto(&buffer, SourceInfo::named("mix.wav"))?;
//!
//! println!("Score: {}", report.final_score);
//! println!("Territory: {:?}", report.territory);
//! ```

#![forbid(unsafe_code)]

pub mod analyzer;
pub mod chunk;
pub mod classify;
pub mod config;
pub mod error;
pub mod filter;
pub mod level;
pub mod loudness;
pub mod math;
pub mod oversample;
pub mod scoring;
pub mod stereo;
pub mod temporal;

pub use analyzer::MixAnalyzer;
pub use chunk::{ChunkAggregator, ChunkPartial, Reduced};
pub use classify::{detect_mastered_file, detect_territory};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use level::{auto_oversample_factor, crest_factor, dc_offset, peak_dbfs, true_peak};
pub use loudness::{LoudnessMeter, LoudnessReading, MeterBackend};
pub use oversample::TruePeakScanner;
pub use scoring::{calculate_minimum_score, final_score, score_metrics};
pub use stereo::{band_correlation, correlation, identify_problem_bands, lr_balance_db, mid_side_ratio};
pub use temporal::TemporalDetector;
