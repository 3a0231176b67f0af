/// Raw measurement types
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Frequency band used for per-band stereo correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// 20–120 Hz
    SubBass,
    /// 120–500 Hz
    BassMids,
    /// 500 Hz–2 kHz
    Mids,
    /// 2–8 kHz
    MidHighs,
    /// 8–20 kHz (upper edge clipped below Nyquist)
    Highs,
}

impl Band {
    /// All bands, low to high
    pub const ALL: [Band; 5] = [
        Band::SubBass,
        Band::BassMids,
        Band::Mids,
        Band::MidHighs,
        Band::Highs,
    ];

    /// Nominal band edges in Hz
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::SubBass => (20.0, 120.0),
            Band::BassMids => (120.0, 500.0),
            Band::Mids => (500.0, 2_000.0),
            Band::MidHighs => (2_000.0, 8_000.0),
            Band::Highs => (8_000.0, 20_000.0),
        }
    }

    /// Stable identifier, matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            Band::SubBass => "sub_bass",
            Band::BassMids => "bass_mids",
            Band::Mids => "mids",
            Band::MidHighs => "mid_highs",
            Band::Highs => "highs",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation per band; `None` means the band had too little energy to judge
pub type BandCorrelations = BTreeMap<Band, Option<f64>>;

/// How integrated loudness was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoudnessMethod {
    /// EBU R128 gated integration (ITU-R BS.1770)
    EbuR128,
    /// Energy-combined RMS in dBFS; not K-weighted, not gated
    RmsApproximation,
}

impl LoudnessMethod {
    /// Whether the value is a lower-fidelity stand-in for LUFS
    pub fn is_approximate(self) -> bool {
        matches!(self, LoudnessMethod::RmsApproximation)
    }
}

/// DC offset measurement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcOffset {
    /// Whether any channel's mean exceeds the detection threshold
    pub detected: bool,

    /// Mean sample value per channel
    pub offsets: Vec<f64>,

    /// Largest absolute per-channel mean
    pub max_offset: f64,
}

/// Measurements from one analysis pass
///
/// Built once per file (or reduced from per-chunk partials) and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    /// Sample peak in dBFS (-120.0 for digital silence)
    pub peak_dbfs: f64,

    /// Oversampled (intersample) peak in dBTP
    pub true_peak_dbtp: f64,

    /// Integrated loudness; `None` when silent
    pub lufs: Option<f64>,

    /// Whether `lufs` is trustworthy (long enough and not silent)
    pub lufs_reliable: bool,

    /// Loudness measurement method
    pub lufs_method: LoudnessMethod,

    /// Peak-to-loudness ratio; `None` unless loudness is reliable
    pub plr: Option<f64>,

    /// Peak-to-RMS ratio in dB
    pub crest_factor_db: f64,

    /// L/R Pearson correlation (-1.0 to 1.0)
    pub correlation: f64,

    /// Correlation per frequency band
    pub band_correlations: BandCorrelations,

    /// Side RMS divided by mid RMS
    pub ms_ratio: f64,

    /// 20·log10(rms_L / rms_R); positive means left-heavier
    pub lr_balance_db: f64,

    /// DC offset per channel
    pub dc_offset: DcOffset,

    /// Samples at or above the clipping level, across all channels
    pub clipped_samples: u64,

    /// Duration of the measured audio in seconds
    pub duration_secs: f64,

    /// Sample rate of the measured audio
    pub sample_rate: u32,

    /// Channel count of the measured audio
    pub channels: usize,
}
