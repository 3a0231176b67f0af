//! Chunk measurement and reduction
//!
//! A file is measured as a sequence of [`ChunkPartial`]s, each holding
//! only sums and extrema that combine without revisiting audio:
//!
//! | Field | Combined by |
//! |---|---|
//! | sample peak, true peak | max |
//! | per-channel Σx², Σx, mid/side Σ², clipped count | sum |
//! | loudness | energy-domain, duration-weighted ([`LoudnessAccumulator`]) |
//! | correlation, band correlations | duration-weighted mean of the linear coefficient |
//! | identical channels | logical and |
//!
//! Combining is associative, so partials may be computed independently and
//! folded in any order. [`ChunkAggregator`] is the fold:
//! `push`/`merge` while accumulating, then `reduce` (consuming) into a
//! [`Reduced`] measurement. A whole-file pass is the same fold over one
//! partial, so both paths produce structurally identical results.

use crate::error::{AnalysisError, Result};
use crate::level::{count_clipped, crest_factor_from, dc_offset_from};
use crate::loudness::{peak_to_loudness_ratio, LoudnessAccumulator, LoudnessMeter};
use crate::math::{abs_peak, amplitude_to_db, safe_divide, sum_squares};
use crate::stereo::{
    balance_from_energy, band_correlation_of, channels_identical, degenerate_correlation, is_flat,
    mid_side_energy, pearson, MidSide,
};
use premaster_core::{AudioBuffer, Band, BandCorrelations, RawMetrics, StereoField};
use std::collections::BTreeMap;
use tracing::debug;

/// Duration-weighted running mean
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedMean {
    sum: f64,
    weight: f64,
}

impl WeightedMean {
    /// Mean holding a single value
    pub fn of(value: f64, weight: f64) -> Self {
        Self {
            sum: value * weight,
            weight,
        }
    }

    /// Combine two means
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            weight: self.weight + other.weight,
        }
    }

    /// The mean, or `None` if nothing was added
    pub fn value(&self) -> Option<f64> {
        (self.weight > 0.0).then(|| self.sum / self.weight)
    }
}

/// Mergeable measurements of one stretch of audio
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPartial {
    sample_rate: u32,
    channels: usize,
    frames: usize,
    duration_secs: f64,
    sample_peak: f64,
    true_peak: f64,
    channel_energy: Vec<f64>,
    channel_sum: Vec<f64>,
    mid_energy: f64,
    side_energy: f64,
    clipped_samples: u64,
    loudness: LoudnessAccumulator,
    correlation: WeightedMean,
    left_flat: bool,
    right_flat: bool,
    bands: BTreeMap<Band, WeightedMean>,
    identical: bool,
}

impl ChunkPartial {
    /// Measure one chunk
    ///
    /// `true_peaks` is the chunk's envelope from
    /// [`TruePeakScanner::scan`](crate::oversample::TruePeakScanner::scan);
    /// the same envelope feeds the temporal windows.
    pub fn measure(buffer: &AudioBuffer, meter: &LoudnessMeter, true_peaks: &[f64]) -> Self {
        let duration_secs = buffer.duration_secs();
        let channels = buffer.channels();

        let sample_peak = channels.iter().fold(0.0_f64, |acc, ch| acc.max(abs_peak(ch)));
        let true_peak = true_peaks.iter().fold(sample_peak, |acc, &p| acc.max(p));

        let (lufs, method) = meter.measure(buffer);
        let mut loudness = LoudnessAccumulator::new();
        loudness.add(lufs, duration_secs, method);

        let (mid_energy, side_energy, correlation, left_flat, right_flat, identical) =
            match buffer.stereo_pair() {
                Some((left, right)) => {
                    let (mid, side) = mid_side_energy(left, right);
                    let correlation = pearson(left, right)
                        .map(|c| WeightedMean::of(c, duration_secs))
                        .unwrap_or_default();
                    (
                        mid,
                        side,
                        correlation,
                        is_flat(left),
                        is_flat(right),
                        channels_identical(left, right),
                    )
                }
                None => {
                    let mono = buffer.channel(0).unwrap_or(&[]);
                    (sum_squares(mono), 0.0, WeightedMean::default(), false, false, false)
                }
            };

        let band_pair = buffer
            .stereo_pair()
            .or_else(|| buffer.channel(0).map(|mono| (mono, mono)));
        let bands = match band_pair {
            Some((left, right)) => band_correlation_of(left, right, buffer.sample_rate()),
            None => BandCorrelations::new(),
        }
        .into_iter()
        .map(|(band, value)| {
            let mean = value.map_or_else(WeightedMean::default, |c| WeightedMean::of(c, duration_secs));
            (band, mean)
        })
        .collect();

        Self {
            sample_rate: buffer.sample_rate(),
            channels: buffer.num_channels(),
            frames: buffer.frames(),
            duration_secs,
            sample_peak,
            true_peak,
            channel_energy: channels.iter().map(|ch| sum_squares(ch)).collect(),
            channel_sum: channels.iter().map(|ch| ch.iter().sum()).collect(),
            mid_energy,
            side_energy,
            clipped_samples: channels.iter().map(|ch| count_clipped(ch)).sum(),
            loudness,
            correlation,
            left_flat,
            right_flat,
            bands,
            identical,
        }
    }

    /// Duration of the audio this partial covers
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.sample_rate != other.sample_rate {
            return Err(AnalysisError::SampleRateMismatch {
                expected: self.sample_rate,
                found: other.sample_rate,
            });
        }
        if self.channels != other.channels {
            return Err(AnalysisError::ChannelCountMismatch {
                expected: self.channels,
                found: other.channels,
            });
        }
        Ok(())
    }

    /// Combine with the partial of another stretch of the same file
    pub fn combine(self, other: Self) -> Result<Self> {
        self.check_compatible(&other)?;

        let add = |a: Vec<f64>, b: Vec<f64>| -> Vec<f64> {
            a.into_iter().zip(b).map(|(x, y)| x + y).collect()
        };

        let mut bands = self.bands;
        for (band, mean) in other.bands {
            let merged = bands.get(&band).copied().unwrap_or_default().merge(mean);
            bands.insert(band, merged);
        }

        Ok(Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frames: self.frames + other.frames,
            duration_secs: self.duration_secs + other.duration_secs,
            sample_peak: self.sample_peak.max(other.sample_peak),
            true_peak: self.true_peak.max(other.true_peak),
            channel_energy: add(self.channel_energy, other.channel_energy),
            channel_sum: add(self.channel_sum, other.channel_sum),
            mid_energy: self.mid_energy + other.mid_energy,
            side_energy: self.side_energy + other.side_energy,
            clipped_samples: self.clipped_samples + other.clipped_samples,
            loudness: self.loudness.merge(other.loudness),
            correlation: self.correlation.merge(other.correlation),
            left_flat: self.left_flat && other.left_flat,
            right_flat: self.right_flat && other.right_flat,
            bands,
            identical: self.identical && other.identical,
        })
    }
}

/// Result of reducing every partial of a file
#[derive(Debug, Clone, PartialEq)]
pub struct Reduced {
    /// File-level measurements
    pub metrics: RawMetrics,
    /// Channel layout as heard
    pub stereo_field: StereoField,
    /// Number of partials folded
    pub num_chunks: usize,
}

/// Fold over chunk partials
#[derive(Debug, Clone, Default)]
pub struct ChunkAggregator {
    acc: Option<ChunkPartial>,
    chunks: usize,
}

impl ChunkAggregator {
    /// Empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of partials folded so far
    pub fn len(&self) -> usize {
        self.chunks
    }

    /// Check if nothing was folded yet
    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    /// Fold in one more partial
    pub fn push(&mut self, partial: ChunkPartial) -> Result<()> {
        self.acc = Some(match self.acc.take() {
            Some(acc) => acc.combine(partial)?,
            None => partial,
        });
        self.chunks += 1;
        Ok(())
    }

    /// Combine with an aggregator built over other chunks of the same file
    pub fn merge(self, other: Self) -> Result<Self> {
        let acc = match (self.acc, other.acc) {
            (Some(a), Some(b)) => Some(a.combine(b)?),
            (a, b) => a.or(b),
        };
        Ok(Self {
            acc,
            chunks: self.chunks + other.chunks,
        })
    }

    /// Produce the file-level measurements
    pub fn reduce(self) -> Result<Reduced> {
        let acc = self.acc.ok_or(AnalysisError::NoChunks)?;
        let frames = acc.frames as f64;

        let reading = acc.loudness.finish();
        let peak_dbfs = amplitude_to_db(acc.sample_peak);
        let plr = peak_to_loudness_ratio(peak_dbfs, &reading, acc.duration_secs);

        let combined_rms = safe_divide(
            acc.channel_energy.iter().sum::<f64>(),
            frames * acc.channels as f64,
            0.0,
        )
        .sqrt();

        let is_stereo = acc.channels >= 2;
        let correlation = if is_stereo {
            acc.correlation
                .value()
                .unwrap_or_else(|| degenerate_correlation(acc.left_flat, acc.right_flat))
        } else {
            1.0
        };
        let lr_balance_db = if is_stereo {
            balance_from_energy(acc.channel_energy[0], acc.channel_energy[1])
        } else {
            0.0
        };

        let stereo_field = if !is_stereo {
            StereoField::TrueMono
        } else if acc.identical {
            StereoField::PseudoStereo
        } else {
            StereoField::Stereo
        };

        let band_correlations: BandCorrelations = Band::ALL
            .iter()
            .map(|band| (*band, acc.bands.get(band).and_then(WeightedMean::value)))
            .collect();

        let offsets = acc
            .channel_sum
            .iter()
            .map(|sum| safe_divide(*sum, frames, 0.0))
            .collect();

        debug!(
            "Reduced {} chunk(s), {:.1}s, loudness {:?} ({:?})",
            self.chunks, acc.duration_secs, reading.lufs, reading.method
        );

        let metrics = RawMetrics {
            peak_dbfs,
            true_peak_dbtp: amplitude_to_db(acc.true_peak),
            lufs: reading.lufs,
            lufs_reliable: reading.reliable,
            lufs_method: reading.method,
            plr,
            crest_factor_db: crest_factor_from(acc.sample_peak, combined_rms),
            correlation,
            band_correlations,
            ms_ratio: MidSide::from_energy(acc.mid_energy, acc.side_energy, acc.frames).ratio,
            lr_balance_db,
            dc_offset: dc_offset_from(offsets),
            clipped_samples: acc.clipped_samples,
            duration_secs: acc.duration_secs,
            sample_rate: acc.sample_rate,
            channels: acc.channels,
        };

        Ok(Reduced {
            metrics,
            stereo_field,
            num_chunks: self.chunks,
        })
    }
}
