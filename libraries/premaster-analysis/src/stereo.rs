//! Stereo metrics: correlation (full-band and per band), mid/side ratio,
//! L/R balance, mono detection
//!
//! Correlation is the Pearson coefficient of zero-meaned L and R:
//! - 1.0 = identical (mono)
//! - 0.0 = unrelated
//! - < 0 = partly phase-inverted; cancels when summed to mono
//!
//! Only the first two channels of a multichannel buffer are treated as the
//! stereo pair. A one-channel buffer reports correlation 1.0 by convention
//! and is told apart from genuinely correlated stereo by [`stereo_field`].

use crate::filter::BandPass;
use crate::math::{mean_square, power_to_db, safe_divide, EPSILON};
use premaster_core::{AudioBuffer, Band, BandCorrelations, PhaseCause, ProblemBand, StereoField};
use std::cmp::Ordering;
use tracing::warn;

/// Minimum standard deviation of a filtered band signal
pub const BAND_MIN_STD: f64 = 1e-10;

/// Minimum band power relative to the channel's broadband power (-50 dB)
pub const BAND_MIN_RELATIVE_POWER: f64 = 1e-5;

/// Largest per-sample difference for two channels to count as identical
pub const IDENTICAL_TOLERANCE: f64 = 1e-9;

/// Default correlation below which a band is reported as a problem
pub const DEFAULT_PROBLEM_BAND_THRESHOLD: f64 = 0.3;

/// Pearson correlation of two signals
///
/// Returns `None` if either signal has (near) zero variance, where the
/// coefficient is undefined.
pub fn pearson(left: &[f64], right: &[f64]) -> Option<f64> {
    let n = left.len().min(right.len());
    if n == 0 {
        return None;
    }
    let (left, right) = (&left[..n], &right[..n]);

    let mean_l = left.iter().sum::<f64>() / n as f64;
    let mean_r = right.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_l = 0.0;
    let mut var_r = 0.0;
    for (&l, &r) in left.iter().zip(right) {
        let dl = l - mean_l;
        let dr = r - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }

    let std_l = (var_l / n as f64).sqrt();
    let std_r = (var_r / n as f64).sqrt();
    if std_l < EPSILON || std_r < EPSILON {
        return None;
    }

    Some((cov / (var_l.sqrt() * var_r.sqrt())).clamp(-1.0, 1.0))
}

/// Correlation used when Pearson is undefined
///
/// Two silent channels are identical (1.0); one silent channel shares
/// nothing with the other (0.0).
pub fn degenerate_correlation(left_flat: bool, right_flat: bool) -> f64 {
    if left_flat && right_flat {
        1.0
    } else {
        0.0
    }
}

/// Whether a signal has no variance worth measuring
pub fn is_flat(samples: &[f64]) -> bool {
    pearson(samples, samples).is_none()
}

/// Full-band L/R correlation in [-1, 1]
pub fn correlation(buffer: &AudioBuffer) -> f64 {
    let Some((left, right)) = buffer.stereo_pair() else {
        return 1.0;
    };
    pearson(left, right).unwrap_or_else(|| degenerate_correlation(is_flat(left), is_flat(right)))
}

/// Whether two channels carry the same samples
pub fn channels_identical(left: &[f64], right: &[f64]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(l, r)| (l - r).abs() <= IDENTICAL_TOLERANCE)
}

/// Classify the channel layout as heard
pub fn stereo_field(buffer: &AudioBuffer) -> StereoField {
    match buffer.stereo_pair() {
        None => StereoField::TrueMono,
        Some((left, right)) if channels_identical(left, right) => StereoField::PseudoStereo,
        Some(_) => StereoField::Stereo,
    }
}

/// Correlation per frequency band
///
/// A band whose filtered signal is too weak on either channel (absolute
/// standard deviation below [`BAND_MIN_STD`], or less than -50 dB of the
/// channel's broadband power) is `None`: there is not enough energy to judge
/// its phase relationship. A band whose filter cannot be designed at this
/// sample rate is `None` as well.
pub fn band_correlation(buffer: &AudioBuffer) -> BandCorrelations {
    match buffer.stereo_pair() {
        Some((left, right)) => band_correlation_of(left, right, buffer.sample_rate()),
        None => {
            let mono = buffer.channel(0).unwrap_or(&[]);
            band_correlation_of(mono, mono, buffer.sample_rate())
        }
    }
}

/// Per-band correlation of an explicit channel pair
pub fn band_correlation_of(left: &[f64], right: &[f64], sample_rate: u32) -> BandCorrelations {
    let broadband_l = mean_square(left);
    let broadband_r = mean_square(right);
    let same_signal = std::ptr::eq(left, right);

    Band::ALL
        .iter()
        .map(|&band| {
            let filter = match BandPass::for_band(band, sample_rate) {
                Ok(filter) => filter,
                Err(e) => {
                    warn!("Skipping {} band correlation: {}", band, e);
                    return (band, None);
                }
            };

            let band_l = filter.filter(left);
            let band_r = if same_signal {
                band_l.clone()
            } else {
                filter.filter(right)
            };

            let audible = has_band_energy(&band_l, broadband_l) && has_band_energy(&band_r, broadband_r);
            let value = if audible { pearson(&band_l, &band_r) } else { None };
            (band, value)
        })
        .collect()
}

fn has_band_energy(filtered: &[f64], broadband_power: f64) -> bool {
    let power = mean_square(filtered);
    power.sqrt() >= BAND_MIN_STD && power >= broadband_power * BAND_MIN_RELATIVE_POWER
}

/// Bands correlating below `threshold`, worst first
///
/// Bands without a value are skipped; missing data is not a problem.
pub fn identify_problem_bands(bands: &BandCorrelations, threshold: f64) -> Vec<ProblemBand> {
    let mut problems: Vec<ProblemBand> = bands
        .iter()
        .filter_map(|(&band, &value)| {
            value.filter(|c| *c < threshold).map(|correlation| ProblemBand {
                band,
                correlation,
                cause: PhaseCause::from(band),
            })
        })
        .collect();
    problems.sort_by(|a, b| {
        a.correlation
            .partial_cmp(&b.correlation)
            .unwrap_or(Ordering::Equal)
    });
    problems
}

/// Mid/side measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidSide {
    /// `side_rms / mid_rms` (0 when mid is silent)
    pub ratio: f64,
    /// RMS of (L+R)/2
    pub mid_rms: f64,
    /// RMS of (L-R)/2
    pub side_rms: f64,
}

impl MidSide {
    /// Build from summed mid and side energies over `frames`
    pub fn from_energy(mid_energy: f64, side_energy: f64, frames: usize) -> Self {
        let mid_rms = safe_divide(mid_energy, frames as f64, 0.0).sqrt();
        let side_rms = safe_divide(side_energy, frames as f64, 0.0).sqrt();
        let ratio = if mid_rms < EPSILON {
            0.0
        } else {
            side_rms / mid_rms
        };
        Self {
            ratio,
            mid_rms,
            side_rms,
        }
    }
}

/// Summed squares of mid and side signals
pub fn mid_side_energy(left: &[f64], right: &[f64]) -> (f64, f64) {
    left.iter()
        .zip(right)
        .fold((0.0, 0.0), |(mid, side), (&l, &r)| {
            let m = (l + r) * 0.5;
            let s = (l - r) * 0.5;
            (mid + m * m, side + s * s)
        })
}

/// Mid/side ratio of the stereo pair; a mono buffer is all mid
pub fn mid_side_ratio(buffer: &AudioBuffer) -> MidSide {
    match buffer.stereo_pair() {
        Some((left, right)) => {
            let (mid, side) = mid_side_energy(left, right);
            MidSide::from_energy(mid, side, buffer.frames())
        }
        None => {
            let mono = buffer.channel(0).unwrap_or(&[]);
            MidSide::from_energy(mono.iter().map(|s| s * s).sum(), 0.0, buffer.frames())
        }
    }
}

/// Balance in dB from summed channel energies over the same frame count
pub fn balance_from_energy(left_energy: f64, right_energy: f64) -> f64 {
    if left_energy < EPSILON && right_energy < EPSILON {
        return 0.0;
    }
    power_to_db(left_energy.max(EPSILON)) - power_to_db(right_energy.max(EPSILON))
}

/// L/R balance, `20·log10(rms_L / rms_R)`; positive means left-heavier
pub fn lr_balance_db(buffer: &AudioBuffer) -> f64 {
    match buffer.stereo_pair() {
        Some((left, right)) => balance_from_energy(
            left.iter().map(|s| s * s).sum(),
            right.iter().map(|s| s * s).sum(),
        ),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const RATE: u32 = 44_100;

    fn tone(freq: f64, amplitude: f64, phase: f64, seconds: f64) -> Vec<f64> {
        let n = (f64::from(RATE) * seconds) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / f64::from(RATE) + phase).sin())
            .collect()
    }

    fn stereo(left: Vec<f64>, right: Vec<f64>) -> AudioBuffer {
        AudioBuffer::new(vec![left, right], RATE).unwrap()
    }

    #[test]
    fn test_identical_channels_are_pseudo_stereo() {
        let ch = tone(440.0, 0.5, 0.0, 1.0);
        let buffer = stereo(ch.clone(), ch);
        assert!((correlation(&buffer) - 1.0).abs() < 1e-9);
        assert_eq!(stereo_field(&buffer), StereoField::PseudoStereo);
    }

    #[test]
    fn test_mono_buffer_is_true_mono() {
        let buffer = AudioBuffer::new(vec![tone(440.0, 0.5, 0.0, 1.0)], RATE).unwrap();
        assert_eq!(correlation(&buffer), 1.0);
        assert_eq!(stereo_field(&buffer), StereoField::TrueMono);
        assert_eq!(lr_balance_db(&buffer), 0.0);
        assert_eq!(mid_side_ratio(&buffer).ratio, 0.0);
    }

    #[test]
    fn test_inverted_channel_is_negative() {
        let left = tone(440.0, 0.5, 0.0, 1.0);
        let right: Vec<f64> = left.iter().map(|s| -s).collect();
        let buffer = stereo(left, right);
        assert!((correlation(&buffer) + 1.0).abs() < 1e-9);
        assert_eq!(stereo_field(&buffer), StereoField::Stereo);
    }

    #[test]
    fn test_quadrature_tones_are_uncorrelated() {
        let buffer = stereo(
            tone(440.0, 0.5, 0.0, 1.0),
            tone(440.0, 0.5, PI / 2.0, 1.0),
        );
        assert!(correlation(&buffer).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_channels_use_convention() {
        let silent = vec![0.0; 1000];
        let ramp: Vec<f64> = (0..1000).map(|i| i as f64 / 1000.0).collect();
        assert_eq!(correlation(&stereo(silent.clone(), silent.clone())), 1.0);
        assert_eq!(correlation(&stereo(ramp, silent)), 0.0);
    }

    #[test]
    fn test_mid_side_of_known_signals() {
        let ch = tone(440.0, 0.5, 0.0, 1.0);
        let ms = mid_side_ratio(&stereo(ch.clone(), ch.clone()));
        assert!(ms.ratio < 1e-12);

        let inverted: Vec<f64> = ch.iter().map(|s| -s).collect();
        let ms = mid_side_ratio(&stereo(ch, inverted));
        assert_eq!(ms.ratio, 0.0, "silent mid reports 0");
        assert!(ms.side_rms > 0.3);
    }

    #[test]
    fn test_balance_sign_and_value() {
        let left = tone(440.0, 0.5, 0.0, 1.0);
        let right = tone(440.0, 0.25, 0.0, 1.0);
        let balance = lr_balance_db(&stereo(left, right));
        assert!((balance - 6.0206).abs() < 0.01);
    }

    #[test]
    fn test_band_energy_only_in_mids() {
        // 1 kHz content with a 50 ms fade-in, slightly different per channel
        let fade = (0.05 * f64::from(RATE)) as usize;
        let shape = |v: Vec<f64>| -> Vec<f64> {
            v.into_iter()
                .enumerate()
                .map(|(i, s)| s * (i as f64 / fade as f64).min(1.0))
                .collect()
        };
        let left = shape(tone(1_000.0, 0.5, 0.0, 2.0));
        let right = shape(tone(1_000.0, 0.5, 0.3, 2.0));
        let bands = band_correlation(&stereo(left, right));

        assert_eq!(bands[&Band::SubBass], None);
        assert_eq!(bands[&Band::Highs], None);
        let mids = bands[&Band::Mids].expect("mids band has energy");
        assert!((-1.0..=1.0).contains(&mids));
        assert!((mids - 0.3_f64.cos()).abs() < 0.02);
    }

    #[test]
    fn test_silent_bands_are_none_not_perfect() {
        let silent = vec![0.0; 44_100];
        let bands = band_correlation(&stereo(silent.clone(), silent));
        assert!(bands.values().all(Option::is_none));
        assert_eq!(bands.len(), 5);
    }

    #[test]
    fn test_problem_bands_worst_first() {
        let mut bands = BandCorrelations::new();
        bands.insert(Band::SubBass, Some(0.1));
        bands.insert(Band::BassMids, Some(0.8));
        bands.insert(Band::Mids, Some(-0.4));
        bands.insert(Band::MidHighs, None);
        bands.insert(Band::Highs, Some(0.29));

        let problems = identify_problem_bands(&bands, DEFAULT_PROBLEM_BAND_THRESHOLD);
        let order: Vec<Band> = problems.iter().map(|p| p.band).collect();
        assert_eq!(order, vec![Band::Mids, Band::SubBass, Band::Highs]);
        assert_eq!(problems[1].cause, PhaseCause::BassKickSidechain);
    }
}
