//! Mix analysis orchestration
//!
//! [`MixAnalyzer`] ties the metric modules together:
//!
//! ```text
//!                ┌─────────────────┐ envelope ┌──────────────┐   partials   ┌─────────────────┐
//!  chunk(s) ───► │ TruePeakScanner │ ───┬───► │ ChunkPartial │ ───────────► │ ChunkAggregator │ ──► RawMetrics
//!                └─────────────────┘    │     └──────────────┘              └─────────────────┘         │
//!                                       │     ┌──────────────────┐                                      ▼
//!                                       └───► │ TemporalDetector │ ──► TemporalReport ──► scoring, classifiers
//!                                             └──────────────────┘                                      │
//!                                                                                                       ▼
//!                                                                                       AnalysisReport (sanitized)
//! ```
//!
//! The whole-file path is the chunked path with a single chunk. The scanner
//! carries the tail of each chunk into the next, so true peak does not
//! depend on where the cuts fall.

use crate::chunk::{ChunkAggregator, ChunkPartial, Reduced};
use crate::classify::{detect_mastered_file, detect_territory};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::loudness::LoudnessMeter;
use crate::oversample::TruePeakScanner;
use crate::scoring::{final_score, score_metrics};
use crate::stereo::identify_problem_bands;
use crate::temporal::TemporalDetector;
use premaster_core::{AnalysisReport, AudioBuffer, CoreError, Sanitize, SourceInfo, TemporalReport};
use tracing::{debug, info, warn};

/// Mastering-readiness analyzer
#[derive(Debug, Clone)]
pub struct MixAnalyzer {
    config: AnalysisConfig,
    meter: LoudnessMeter,
}

impl MixAnalyzer {
    /// Create an analyzer
    ///
    /// # Errors
    /// Returns [`AnalysisError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        debug!("Loudness backend: {:?}", config.meter);
        Ok(Self {
            meter: LoudnessMeter::new(config.meter),
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a whole buffer in one pass
    pub fn analyze(&self, buffer: &AudioBuffer, source: SourceInfo) -> Result<AnalysisReport> {
        if buffer.is_empty() {
            return Err(CoreError::EmptyBuffer.into());
        }

        let true_peaks = self.scanner_for(buffer).scan(buffer.channels());
        let mut aggregator = ChunkAggregator::new();
        aggregator.push(ChunkPartial::measure(buffer, &self.meter, &true_peaks))?;

        let mut detector = TemporalDetector::new(self.config.window_seconds);
        detector.push(buffer, &true_peaks);

        Ok(self.build_report(aggregator.reduce()?, detector.finish(), source))
    }

    /// Analyze a file delivered as consecutive chunks, in file order
    ///
    /// Every chunk must share the first chunk's sample rate and channel
    /// count.
    pub fn analyze_chunked<I>(&self, chunks: I, source: SourceInfo) -> Result<AnalysisReport>
    where
        I: IntoIterator<Item = AudioBuffer>,
    {
        let mut chunks = chunks.into_iter().peekable();
        let first = chunks.peek().ok_or(AnalysisError::NoChunks)?;
        let mut scanner = self.scanner_for(first);

        let mut aggregator = ChunkAggregator::new();
        let mut detector = TemporalDetector::new(self.config.window_seconds);
        for chunk in chunks {
            let true_peaks = scanner.scan(chunk.channels());
            aggregator.push(ChunkPartial::measure(&chunk, &self.meter, &true_peaks))?;
            detector.push(&chunk, &true_peaks);
        }
        debug!("Measured {} chunks", aggregator.len());

        Ok(self.build_report(aggregator.reduce()?, detector.finish(), source))
    }

    /// Pick the whole-file or chunked path by duration
    pub fn analyze_auto(&self, buffer: &AudioBuffer, source: SourceInfo) -> Result<AnalysisReport> {
        if buffer.duration_secs() > self.config.chunk_threshold_seconds {
            debug!(
                "{:.1}s exceeds {:.1}s, analysing in {:.1}s chunks",
                buffer.duration_secs(),
                self.config.chunk_threshold_seconds,
                self.config.chunk_seconds
            );
            self.analyze_chunked(buffer.chunks(self.config.chunk_seconds), source)
        } else {
            self.analyze(buffer, source)
        }
    }

    fn scanner_for(&self, buffer: &AudioBuffer) -> TruePeakScanner {
        let factor = self.config.oversample_factor_for(buffer.sample_rate());
        debug!("True-peak oversampling {}x at {} Hz", factor, buffer.sample_rate());
        TruePeakScanner::new(factor)
    }

    fn build_report(
        &self,
        reduced: Reduced,
        temporal: TemporalReport,
        source: SourceInfo,
    ) -> AnalysisReport {
        let Reduced {
            metrics,
            stereo_field,
            num_chunks,
        } = reduced;
        let mode = self.config.mode;

        let (scores, hard_fail) = score_metrics(&metrics, mode);
        let final_score = final_score(&scores);
        let territory = detect_territory(metrics.lufs, metrics.peak_dbfs, metrics.true_peak_dbtp);
        let mastered = detect_mastered_file(
            metrics.lufs,
            metrics.peak_dbfs,
            metrics.true_peak_dbtp,
            metrics.plr,
            temporal.tp_clipping_pct,
        );
        let problem_bands =
            identify_problem_bands(&metrics.band_correlations, self.config.problem_band_threshold);

        if hard_fail {
            warn!(
                "{}: true peak {:.2} dBTP is beyond recovery",
                source.display_name(),
                metrics.true_peak_dbtp
            );
        }

        let mut report = AnalysisReport {
            source,
            mode,
            metrics,
            scores,
            hard_fail,
            territory,
            mastered,
            stereo_field,
            problem_bands,
            temporal,
            final_score,
            num_chunks,
        };

        let replaced = report.sanitize();
        if replaced > 0 {
            warn!("Replaced {} non-finite value(s) in report", replaced);
        }

        info!(
            "Analyzed {}: score {}, territory {:?}, {} chunk(s)",
            report.source.display_name(),
            report.final_score,
            report.territory,
            report.num_chunks
        );

        report
    }
}
