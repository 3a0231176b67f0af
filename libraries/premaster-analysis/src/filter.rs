//! Band-pass filters for per-band stereo correlation
//!
//! Each band is a cascade of a 4th-order Butterworth high-pass at the lower
//! edge and a 4th-order Butterworth low-pass at the upper edge, each built
//! from two biquad sections. Filtering is forward-only and starts from a
//! zeroed state on every call, so left and right (and every chunk) see
//! exactly the same filter.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use premaster_core::Band;
use thiserror::Error;

/// Section Q values of a 4th-order Butterworth response
const BUTTERWORTH_4_Q: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_376_6];

/// Fraction of Nyquist the upper band edge is clipped to
const NYQUIST_GUARD: f64 = 0.95;

/// Why a band filter could not be built
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Band lies entirely above the usable bandwidth
    #[error("Band {low_hz:.0}-{high_hz:.0} Hz does not fit below Nyquist at {sample_rate} Hz")]
    BandAboveNyquist {
        /// Lower edge
        low_hz: f64,
        /// Upper edge after clipping
        high_hz: f64,
        /// Sample rate
        sample_rate: u32,
    },

    /// Coefficient design rejected the parameters
    #[error("Biquad design failed: {0}")]
    Design(String),
}

/// Band edges for a sample rate, upper edge clipped below Nyquist
pub fn band_edges(band: Band, sample_rate: u32) -> Result<(f64, f64), FilterError> {
    let (low_hz, nominal_high) = band.range_hz();
    let high_hz = nominal_high.min(f64::from(sample_rate) / 2.0 * NYQUIST_GUARD);
    if low_hz >= high_hz {
        return Err(FilterError::BandAboveNyquist {
            low_hz,
            high_hz,
            sample_rate,
        });
    }
    Ok((low_hz, high_hz))
}

/// Cascaded high-pass + low-pass band filter
#[derive(Clone)]
pub struct BandPass {
    sections: Vec<Coefficients<f64>>,
}

impl BandPass {
    /// Design a band-pass between `low_hz` and `high_hz`
    pub fn new(sample_rate: u32, low_hz: f64, high_hz: f64) -> Result<Self, FilterError> {
        let fs = f64::from(sample_rate).hz();
        let mut sections = Vec::with_capacity(4);

        for (high_pass, cutoff) in [(true, low_hz), (false, high_hz)] {
            for q in BUTTERWORTH_4_Q {
                let kind = if high_pass { Type::HighPass } else { Type::LowPass };
                let coeffs = Coefficients::<f64>::from_params(kind, fs, cutoff.hz(), q)
                    .map_err(|e| FilterError::Design(format!("{:?}", e)))?;
                sections.push(coeffs);
            }
        }

        Ok(Self { sections })
    }

    /// Design the filter for a named band
    pub fn for_band(band: Band, sample_rate: u32) -> Result<Self, FilterError> {
        let (low_hz, high_hz) = band_edges(band, sample_rate)?;
        Self::new(sample_rate, low_hz, high_hz)
    }

    /// Filter a whole signal from a zeroed state
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut stages: Vec<DirectForm2Transposed<f64>> = self
            .sections
            .iter()
            .map(|&coeffs| DirectForm2Transposed::<f64>::new(coeffs))
            .collect();
        input
            .iter()
            .map(|&x| stages.iter_mut().fold(x, |acc, stage| stage.run(acc)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::rms;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: u32, seconds: f64) -> Vec<f64> {
        let n = (f64::from(sample_rate) * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / f64::from(sample_rate)).sin())
            .collect()
    }

    #[test]
    fn test_highs_band_is_clipped_below_nyquist() {
        let (low, high) = band_edges(Band::Highs, 32_000).unwrap();
        assert_eq!(low, 8_000.0);
        assert!((high - 15_200.0).abs() < 1e-9);

        assert!(matches!(
            band_edges(Band::Highs, 16_000),
            Err(FilterError::BandAboveNyquist { .. })
        ));
    }

    #[test]
    fn test_passes_in_band_and_rejects_out_of_band() {
        let rate = 48_000;
        let mids = BandPass::for_band(Band::Mids, rate).unwrap();

        let in_band = mids.filter(&sine(1_000.0, rate, 1.0));
        let gain = rms(&in_band[4_800..]) / (0.5_f64).sqrt();
        assert!(gain > 0.9, "1 kHz should pass the mids band, gain {gain}");

        let out_of_band = mids.filter(&sine(60.0, rate, 1.0));
        let gain = rms(&out_of_band[4_800..]) / (0.5_f64).sqrt();
        assert!(gain < 0.01, "60 Hz should be rejected, gain {gain}");
    }

    #[test]
    fn test_filter_is_repeatable() {
        let rate = 44_100;
        let signal = sine(300.0, rate, 0.2);
        let band = BandPass::for_band(Band::BassMids, rate).unwrap();
        let first = band.filter(&signal);
        let second = band.filter(&signal);
        assert_eq!(first, second);
    }
}
