//! Integrated loudness (EBU R128) with reliability gating
//!
//! Measurement uses the `ebur128` crate when the default `r128` feature is
//! enabled. Without it, or if the meter rejects the input, loudness is
//! approximated by energy-combined RMS in dBFS and tagged
//! [`LoudnessMethod::RmsApproximation`].
//!
//! # Reliability
//!
//! Gated integration needs several 400 ms blocks to settle, so a reading is
//! only `reliable` when the audio is at least [`MIN_DURATION_FOR_LUFS`] long
//! and not silent. Silence (everything below the -70 LUFS absolute gate)
//! yields `lufs: None`, never a made-up number.
//!
//! # Chunked loudness
//!
//! Per-chunk values are combined in the energy domain:
//!
//! ```text
//! L = 10·log10( Σ wᵢ·10^(Lᵢ/10) / Σ wᵢ )     wᵢ = chunk duration
//! ```
//!
//! Averaging the dB values directly would under-weight loud passages.

use crate::math::{combined_rms, db_to_power, power_to_db, EPSILON};
use premaster_core::{AudioBuffer, LoudnessMethod};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Minimum duration for a trustworthy integrated loudness, in seconds
pub const MIN_DURATION_FOR_LUFS: f64 = 3.0;

/// EBU R128 absolute gate; anything at or below is treated as silence
pub const SILENCE_GATE_LUFS: f64 = -70.0;

/// Frames interleaved per meter call
#[cfg(feature = "r128")]
const METER_BLOCK_FRAMES: usize = 8192;

/// Loudness measurement backend
///
/// Resolved once (usually via [`MeterBackend::detect`]) and handed to
/// [`LoudnessMeter::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterBackend {
    /// EBU R128 gated integration
    R128,
    /// Energy-combined RMS approximation
    RmsFallback,
}

impl MeterBackend {
    /// Best backend compiled into this build
    pub fn detect() -> Self {
        if cfg!(feature = "r128") {
            Self::R128
        } else {
            Self::RmsFallback
        }
    }
}

impl Default for MeterBackend {
    fn default() -> Self {
        Self::detect()
    }
}

/// Result of an integrated loudness measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessReading {
    /// Integrated loudness; `None` when the signal never rises above the gate
    pub lufs: Option<f64>,
    /// How the value was obtained
    pub method: LoudnessMethod,
    /// Long enough and loud enough to be trusted
    pub reliable: bool,
}

/// Integrated loudness meter
#[derive(Debug, Clone, Copy)]
pub struct LoudnessMeter {
    backend: MeterBackend,
}

impl LoudnessMeter {
    /// Create a meter using the given backend
    pub fn new(backend: MeterBackend) -> Self {
        Self { backend }
    }

    /// Backend this meter was configured with
    pub fn backend(&self) -> MeterBackend {
        self.backend
    }

    /// Measure integrated loudness of a buffer
    pub fn integrated_loudness(&self, buffer: &AudioBuffer) -> LoudnessReading {
        let (lufs, method) = self.measure(buffer);
        let reliable = lufs.is_some() && buffer.duration_secs() >= MIN_DURATION_FOR_LUFS;
        LoudnessReading {
            lufs,
            method,
            reliable,
        }
    }

    /// Loudness without the reliability decision (used per chunk)
    pub(crate) fn measure(&self, buffer: &AudioBuffer) -> (Option<f64>, LoudnessMethod) {
        match self.backend {
            MeterBackend::R128 => match r128_loudness(buffer) {
                Ok(lufs) => (lufs, LoudnessMethod::EbuR128),
                Err(reason) => {
                    warn!("EBU R128 meter unavailable ({}), using RMS approximation", reason);
                    (rms_loudness(buffer), LoudnessMethod::RmsApproximation)
                }
            },
            MeterBackend::RmsFallback => (rms_loudness(buffer), LoudnessMethod::RmsApproximation),
        }
    }
}

impl Default for LoudnessMeter {
    fn default() -> Self {
        Self::new(MeterBackend::detect())
    }
}

/// Gated integrated loudness via `ebur128`
///
/// The meter expects frames (samples-by-channels), so the channel-major
/// buffer is interleaved block by block.
#[cfg(feature = "r128")]
fn r128_loudness(buffer: &AudioBuffer) -> std::result::Result<Option<f64>, String> {
    use ebur128::{EbuR128, Mode};

    let channels = u32::try_from(buffer.num_channels())
        .map_err(|_| format!("{} channels", buffer.num_channels()))?;
    let mut meter = EbuR128::new(channels, buffer.sample_rate(), Mode::I)
        .map_err(|e| format!("{:?}", e))?;

    let frames = buffer.frames();
    let num_channels = buffer.num_channels();
    let mut interleaved = Vec::with_capacity(METER_BLOCK_FRAMES * num_channels);
    let mut start = 0;
    while start < frames {
        let end = (start + METER_BLOCK_FRAMES).min(frames);
        interleaved.clear();
        for frame in start..end {
            for ch in buffer.channels() {
                interleaved.push(ch[frame]);
            }
        }
        meter
            .add_frames_f64(&interleaved)
            .map_err(|e| format!("{:?}", e))?;
        start = end;
    }

    let lufs = meter.loudness_global().map_err(|e| format!("{:?}", e))?;
    debug!("EBU R128 integrated loudness: {:.2} LUFS", lufs);

    // ebur128 reports -inf when no block passes the absolute gate
    Ok((lufs.is_finite() && lufs > SILENCE_GATE_LUFS).then_some(lufs))
}

#[cfg(not(feature = "r128"))]
fn r128_loudness(_buffer: &AudioBuffer) -> std::result::Result<Option<f64>, String> {
    Err("built without the r128 feature".to_string())
}

/// Energy-combined RMS in dBFS, `None` below the silence gate
fn rms_loudness(buffer: &AudioBuffer) -> Option<f64> {
    let rms = combined_rms(buffer.channels());
    if rms < EPSILON {
        return None;
    }
    let db = power_to_db(rms * rms);
    (db > SILENCE_GATE_LUFS).then_some(db)
}

/// Peak-to-loudness ratio, only when loudness can be trusted
///
/// Returns `None` for unreliable or absent loudness and for audio shorter
/// than [`MIN_DURATION_FOR_LUFS`]; never a clamped stand-in.
pub fn peak_to_loudness_ratio(
    peak_dbfs: f64,
    reading: &LoudnessReading,
    duration_secs: f64,
) -> Option<f64> {
    if !reading.reliable || duration_secs < MIN_DURATION_FOR_LUFS {
        return None;
    }
    reading.lufs.map(|lufs| peak_dbfs - lufs)
}

/// Duration-weighted energy average of per-chunk loudness values
///
/// Merging is associative and commutative, so chunk results may be folded in
/// any order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessAccumulator {
    weighted_power: f64,
    gated_seconds: f64,
    total_seconds: f64,
    approximate: bool,
}

impl LoudnessAccumulator {
    /// Empty accumulator
    pub fn new() -> Self {
        Self {
            weighted_power: 0.0,
            gated_seconds: 0.0,
            total_seconds: 0.0,
            approximate: false,
        }
    }

    /// Add one chunk's loudness; silent chunks only count toward duration
    pub fn add(&mut self, lufs: Option<f64>, duration_secs: f64, method: LoudnessMethod) {
        self.total_seconds += duration_secs;
        self.approximate |= method.is_approximate();
        if let Some(lufs) = lufs.filter(|l| l.is_finite() && *l > SILENCE_GATE_LUFS) {
            self.weighted_power += duration_secs * db_to_power(lufs);
            self.gated_seconds += duration_secs;
        }
    }

    /// Combine two accumulators
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            weighted_power: self.weighted_power + other.weighted_power,
            gated_seconds: self.gated_seconds + other.gated_seconds,
            total_seconds: self.total_seconds + other.total_seconds,
            approximate: self.approximate || other.approximate,
        }
    }

    /// Final reading; unreliable and `None` if every chunk was silent
    pub fn finish(&self) -> LoudnessReading {
        let method = if self.approximate {
            LoudnessMethod::RmsApproximation
        } else {
            LoudnessMethod::EbuR128
        };

        if self.gated_seconds <= 0.0 {
            return LoudnessReading {
                lufs: None,
                method,
                reliable: false,
            };
        }

        let lufs = power_to_db(self.weighted_power / self.gated_seconds);
        LoudnessReading {
            lufs: Some(lufs),
            method,
            reliable: self.total_seconds >= MIN_DURATION_FOR_LUFS,
        }
    }
}

impl Default for LoudnessAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
