//! Polyphase FIR interpolation for true-peak estimation
//!
//! An `L`× oversampler is a bank of `L` fractional-delay filters. Phase 0 is
//! the original sample; phase `p` estimates the waveform `p/L` of a sample
//! period later using a Hann-windowed sinc. Only the peak of the
//! reconstructed signal is needed, so the interpolated stream is never
//! materialised.
//!
//! [`TruePeakScanner`] is the streaming form used by the analyzer. It keeps
//! the last [`CARRY_FRAMES`] samples of every channel, so an interpolation
//! point whose filter support straddles a chunk cut is still evaluated, and
//! evaluated exactly once.
//!
//! ```text
//!   x[n-1]      x[n]   ·    ·    ·   x[n+1]
//!     │          │    p=1  p=2  p=3    │
//!     ▼          ▼     ▼    ▼    ▼     ▼
//!   ──●──────────●─────○────○────○─────●──   (4× reconstruction)
//! ```

use std::f64::consts::PI;

/// Taps on each side of the interpolation point
const HALF_TAPS: usize = 12;

/// Samples per channel a [`TruePeakScanner`] carries between calls
pub const CARRY_FRAMES: usize = 2 * HALF_TAPS - 1;

/// Polyphase interpolator used to estimate intersample peaks
#[derive(Debug, Clone)]
pub struct Oversampler {
    factor: usize,
    /// Filter taps for phases 1..factor; tap `j` weights `x[n + j - (HALF_TAPS - 1)]`
    phases: Vec<[f64; 2 * HALF_TAPS]>,
}

impl Oversampler {
    /// Create an interpolator for the given factor
    ///
    /// A factor of 0 or 1 disables interpolation.
    pub fn new(factor: usize) -> Self {
        let factor = factor.max(1);
        let phases = (1..factor)
            .map(|p| Self::design_phase(p as f64 / factor as f64))
            .collect();
        Self { factor, phases }
    }

    /// Oversampling factor
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Windowed-sinc taps for a fractional delay, normalised to unity DC gain
    fn design_phase(frac: f64) -> [f64; 2 * HALF_TAPS] {
        let half = HALF_TAPS as f64;
        let mut taps = [0.0; 2 * HALF_TAPS];
        for (j, tap) in taps.iter_mut().enumerate() {
            let k = j as f64 - (half - 1.0);
            let distance = k - frac;
            let sinc = if distance.abs() < 1e-12 {
                1.0
            } else {
                (PI * distance).sin() / (PI * distance)
            };
            let window = if distance.abs() < half {
                0.5 * (1.0 + (PI * distance / half).cos())
            } else {
                0.0
            };
            *tap = sinc * window;
        }
        let sum: f64 = taps.iter().sum();
        if sum.abs() > f64::EPSILON {
            for tap in &mut taps {
                *tap /= sum;
            }
        }
        taps
    }

    /// Largest absolute value of the reconstructed signal
    ///
    /// Only interpolation points whose whole filter support lies inside the
    /// slice are evaluated, so the edges of the slice do not invent
    /// overshoot. The sample peak always counts.
    pub fn peak(&self, samples: &[f64]) -> f64 {
        let sample_peak = samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
        if self.phases.is_empty() {
            return sample_peak;
        }

        samples
            .windows(2 * HALF_TAPS)
            .map(|support| self.support_peak(support))
            .fold(sample_peak, f64::max)
    }

    /// Largest interpolated magnitude over one full filter support
    fn support_peak(&self, support: &[f64]) -> f64 {
        self.phases
            .iter()
            .map(|taps| {
                support
                    .iter()
                    .zip(taps.iter())
                    .map(|(x, h)| x * h)
                    .sum::<f64>()
                    .abs()
            })
            .fold(0.0_f64, f64::max)
    }
}

/// Streaming true-peak envelope
///
/// [`scan`](Self::scan) returns one value per frame: the largest of that
/// frame's sample magnitudes and of every interpolation point whose filter
/// support ends on it, across channels. Every point of the stream lands on
/// exactly one frame, so the envelope does not depend on how the audio was
/// cut into chunks.
#[derive(Debug, Clone)]
pub struct TruePeakScanner {
    oversampler: Oversampler,
    history: Vec<Vec<f64>>,
}

impl TruePeakScanner {
    /// Create a scanner for the given oversampling factor
    pub fn new(factor: usize) -> Self {
        Self {
            oversampler: Oversampler::new(factor),
            history: Vec::new(),
        }
    }

    /// Oversampling factor
    pub fn factor(&self) -> usize {
        self.oversampler.factor()
    }

    /// Envelope of the next stretch of audio, in file order
    pub fn scan(&mut self, channels: &[Vec<f64>]) -> Vec<f64> {
        let frames = channels.first().map_or(0, Vec::len);
        let mut envelope = vec![0.0_f64; frames];
        if self.history.len() != channels.len() {
            self.history = vec![Vec::new(); channels.len()];
        }

        for (samples, history) in channels.iter().zip(self.history.iter_mut()) {
            for (slot, s) in envelope.iter_mut().zip(samples) {
                *slot = slot.max(s.abs());
            }
            if self.oversampler.phases.is_empty() {
                continue;
            }

            let carried = history.len();
            let joined: Vec<f64> = history.iter().chain(samples).copied().collect();
            for (start, support) in joined.windows(2 * HALF_TAPS).enumerate() {
                // The support ends on joined[start + CARRY_FRAMES]
                if let Some(slot) = envelope.get_mut(start + CARRY_FRAMES - carried) {
                    *slot = slot.max(self.oversampler.support_peak(support));
                }
            }

            let keep = joined.len().saturating_sub(CARRY_FRAMES);
            *history = joined[keep..].to_vec();
        }

        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_one_is_sample_peak() {
        let os = Oversampler::new(1);
        assert_eq!(os.peak(&[0.1, -0.7, 0.3]), 0.7);
        assert_eq!(Oversampler::new(0).factor(), 1);
    }

    #[test]
    fn test_recovers_intersample_peak() {
        // fs/4 sine sampled 45° off its crest: samples sit at ±0.7071
        let samples: Vec<f64> = (0..4096)
            .map(|n| (PI / 2.0 * n as f64 + PI / 4.0).sin())
            .collect();
        let sample_peak = samples.iter().fold(0.0_f64, |a, s| a.max(s.abs()));
        assert!((sample_peak - 0.7071).abs() < 1e-3);

        let true_peak = Oversampler::new(4).peak(&samples);
        assert!(
            (true_peak - 1.0).abs() < 0.02,
            "expected ~1.0, got {true_peak}"
        );
    }

    #[test]
    fn test_truncation_does_not_overshoot() {
        // A DC step cut at the slice edge must not ring above the step itself
        let samples = vec![0.5; 256];
        let peak = Oversampler::new(4).peak(&samples);
        assert!((peak - 0.5).abs() < 1e-9, "got {peak}");
    }

    #[test]
    fn test_phases_have_unity_dc_gain() {
        let os = Oversampler::new(4);
        assert_eq!(os.phases.len(), 3);
        for taps in &os.phases {
            let sum: f64 = taps.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    /// Eight-sample fs/4 burst at 1.26 and 45° of phase, starting at `at`
    fn burst(len: usize, at: usize) -> Vec<f64> {
        let mut samples = vec![0.0; len];
        for (k, slot) in samples[at..at + 8].iter_mut().enumerate() {
            *slot = 1.26 * (PI / 2.0 * k as f64 + PI / 4.0).sin();
        }
        samples
    }

    #[test]
    fn test_scanner_envelope_peak_matches_whole_slice() {
        let samples = burst(512, 200);
        let envelope = TruePeakScanner::new(4).scan(&[samples.clone()]);
        assert_eq!(envelope.len(), samples.len());
        let scanned = envelope.iter().fold(0.0_f64, |a, &e| a.max(e));
        assert_eq!(scanned, Oversampler::new(4).peak(&samples));
    }

    #[test]
    fn test_scanner_is_independent_of_cuts() {
        // The burst straddles frame 256
        let samples = burst(512, 252);
        let whole = TruePeakScanner::new(4).scan(&[samples.clone()]);

        let mut scanner = TruePeakScanner::new(4);
        let mut pieces = Vec::new();
        for range in [0..100, 100..256, 256..260, 260..512] {
            pieces.extend(scanner.scan(&[samples[range].to_vec()]));
        }
        assert_eq!(whole, pieces);

        let sample_peak = samples.iter().fold(0.0_f64, |a, s| a.max(s.abs()));
        let true_peak = whole.iter().fold(0.0_f64, |a, &e| a.max(e));
        assert!((sample_peak - 0.891).abs() < 1e-3);
        assert!(true_peak > 1.0, "got {true_peak}");
    }

    #[test]
    fn test_scanner_without_oversampling_is_sample_magnitude() {
        let mut scanner = TruePeakScanner::new(1);
        let envelope = scanner.scan(&[vec![0.1, -0.7], vec![-0.2, 0.3]]);
        assert_eq!(envelope, vec![0.2, 0.7]);
        assert_eq!(scanner.factor(), 1);
    }
}
