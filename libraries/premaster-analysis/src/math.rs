//! Numeric helpers shared by every metric
//!
//! All level conversions floor their inputs so that silence maps to
//! [`DIGITAL_SILENCE_DB`] instead of `-Inf`, and every ratio goes through
//! [`safe_divide`].

/// Level reported for an all-zero signal
pub const DIGITAL_SILENCE_DB: f64 = -120.0;

/// Smallest denominator or standard deviation treated as non-zero
pub const EPSILON: f64 = 1e-10;

/// Divide, returning `fallback` when the denominator is within [`EPSILON`] of zero
#[inline]
pub fn safe_divide(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator.abs() < EPSILON {
        fallback
    } else {
        numerator / denominator
    }
}

/// `log10` with the argument floored at [`EPSILON`]
#[inline]
pub fn safe_log10(value: f64) -> f64 {
    value.max(EPSILON).log10()
}

/// Convert a linear amplitude to dB, floored at [`DIGITAL_SILENCE_DB`]
#[inline]
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    if amplitude.is_nan() || amplitude <= 0.0 {
        return DIGITAL_SILENCE_DB;
    }
    (20.0 * amplitude.log10()).max(DIGITAL_SILENCE_DB)
}

/// Convert a power (mean square) to dB, floored at [`DIGITAL_SILENCE_DB`]
#[inline]
pub fn power_to_db(power: f64) -> f64 {
    if power.is_nan() || power <= 0.0 {
        return DIGITAL_SILENCE_DB;
    }
    (10.0 * power.log10()).max(DIGITAL_SILENCE_DB)
}

/// Convert dB to a linear amplitude
#[inline]
pub fn db_to_amplitude(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert dB to a power ratio
#[inline]
pub fn db_to_power(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}

/// Sum of squares of a signal
#[inline]
pub fn sum_squares(samples: &[f64]) -> f64 {
    samples.iter().map(|s| s * s).sum()
}

/// Mean square (power) of a signal; 0 for an empty slice
#[inline]
pub fn mean_square(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        sum_squares(samples) / samples.len() as f64
    }
}

/// Root mean square of a signal
#[inline]
pub fn rms(samples: &[f64]) -> f64 {
    mean_square(samples).sqrt()
}

/// Largest absolute sample
#[inline]
pub fn abs_peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()))
}

/// Energy-combined RMS across channels: `sqrt(mean(rms_ch²))`
///
/// Equivalent to the RMS of every sample of every channel taken together
/// when channels have equal length.
pub fn combined_rms(channels: &[Vec<f64>]) -> f64 {
    if channels.is_empty() {
        return 0.0;
    }
    let power: f64 = channels.iter().map(|ch| mean_square(ch)).sum::<f64>() / channels.len() as f64;
    power.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_floored() {
        assert_eq!(amplitude_to_db(0.0), DIGITAL_SILENCE_DB);
        assert_eq!(power_to_db(0.0), DIGITAL_SILENCE_DB);
        assert_eq!(amplitude_to_db(1e-30), DIGITAL_SILENCE_DB);
        assert!(safe_log10(0.0).is_finite());
    }

    #[test]
    fn test_db_conversions_roundtrip() {
        for db in [-60.0, -6.0, 0.0, 3.0] {
            assert!((amplitude_to_db(db_to_amplitude(db)) - db).abs() < 1e-9);
            assert!((power_to_db(db_to_power(db)) - db).abs() < 1e-9);
        }
    }

    #[test]
    fn test_safe_divide_uses_fallback() {
        assert_eq!(safe_divide(1.0, 0.0, 7.0), 7.0);
        assert_eq!(safe_divide(1.0, 1e-12, 7.0), 7.0);
        assert_eq!(safe_divide(1.0, 4.0, 7.0), 0.25);
    }

    #[test]
    fn test_combined_rms_is_energy_mean() {
        let loud = vec![1.0, -1.0, 1.0, -1.0];
        let silent = vec![0.0; 4];
        let rms = combined_rms(&[loud, silent]);
        assert!((rms - 0.5_f64.sqrt()).abs() < 1e-12);
    }
}
