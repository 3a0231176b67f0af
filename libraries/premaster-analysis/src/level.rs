//! Level metrics: sample peak, true peak, crest factor, DC offset, clipping
//!
//! Multichannel rules:
//! - Peaks are the maximum over every channel
//! - RMS is energy-combined, `sqrt(mean(rms_ch²))`, the same rule the
//!   loudness fallback uses, so crest factor and PLR agree on what
//!   "level" means

use crate::math::{abs_peak, amplitude_to_db, combined_rms, safe_divide, EPSILON};
use crate::oversample::Oversampler;
use premaster_core::{AudioBuffer, DcOffset};

/// Mean level above which a channel is flagged for DC offset
pub const DC_OFFSET_THRESHOLD: f64 = 0.01;

/// Absolute sample level counted as clipped
pub const CLIP_SAMPLE_LEVEL: f64 = 0.999;

/// Oversampling factor needed to resolve intersample peaks
///
/// - ≤ 48 kHz: 4×
/// - 88.2/96 kHz (anything below 176.4 kHz): 2×
/// - ≥ 176.4 kHz: 1× (the signal is already finely sampled)
pub fn auto_oversample_factor(sample_rate: u32) -> usize {
    if sample_rate <= 48_000 {
        4
    } else if sample_rate < 176_400 {
        2
    } else {
        1
    }
}

/// Largest absolute sample across all channels (linear)
pub fn sample_peak(buffer: &AudioBuffer) -> f64 {
    buffer
        .channels()
        .iter()
        .fold(0.0_f64, |acc, ch| acc.max(abs_peak(ch)))
}

/// Sample peak in dBFS; -120.0 for digital silence
pub fn peak_dbfs(buffer: &AudioBuffer) -> f64 {
    amplitude_to_db(sample_peak(buffer))
}

/// Oversampled peak across all channels (linear)
pub fn true_peak_linear(buffer: &AudioBuffer, oversample_factor: usize) -> f64 {
    let oversampler = Oversampler::new(oversample_factor);
    buffer
        .channels()
        .iter()
        .fold(0.0_f64, |acc, ch| acc.max(oversampler.peak(ch)))
}

/// True peak in dBTP
///
/// Each channel is interpolated independently; the result approximates the
/// intersample peak a reconstruction filter (or a brick-wall limiter) would
/// have to handle.
pub fn true_peak(buffer: &AudioBuffer, oversample_factor: usize) -> f64 {
    amplitude_to_db(true_peak_linear(buffer, oversample_factor))
}

/// Crest factor (peak-to-RMS ratio) in dB
///
/// Returns 0.0 for silence.
pub fn crest_factor(buffer: &AudioBuffer) -> f64 {
    crest_factor_from(sample_peak(buffer), combined_rms(buffer.channels()))
}

/// Crest factor from a linear peak and a linear RMS
pub fn crest_factor_from(peak: f64, rms: f64) -> f64 {
    if rms < EPSILON {
        return 0.0;
    }
    20.0 * safe_divide(peak, rms, 1.0).max(EPSILON).log10()
}

/// Per-channel DC offset
pub fn dc_offset(buffer: &AudioBuffer) -> DcOffset {
    let frames = buffer.frames();
    let offsets: Vec<f64> = buffer
        .channels()
        .iter()
        .map(|ch| safe_divide(ch.iter().sum(), frames as f64, 0.0))
        .collect();
    dc_offset_from(offsets)
}

/// Build a [`DcOffset`] from per-channel means
pub fn dc_offset_from(offsets: Vec<f64>) -> DcOffset {
    let max_offset = offsets.iter().fold(0.0_f64, |acc, o| acc.max(o.abs()));
    DcOffset {
        detected: max_offset > DC_OFFSET_THRESHOLD,
        offsets,
        max_offset,
    }
}

/// Number of samples at or above [`CLIP_SAMPLE_LEVEL`], across all channels
pub fn clipped_samples(buffer: &AudioBuffer) -> u64 {
    buffer
        .channels()
        .iter()
        .map(|ch| count_clipped(ch))
        .sum()
}

/// Number of clipped samples in one channel
pub fn count_clipped(samples: &[f64]) -> u64 {
    samples.iter().filter(|s| s.abs() >= CLIP_SAMPLE_LEVEL).count() as u64
}
