/// Report types
use super::audio::SourceInfo;
use super::metrics::{Band, RawMetrics};
use super::scoring::{FinalScore, MetricKind, ScoredMetric, ScoringMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Loudness/peak regime of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Territory {
    /// Ordinary pre-master mix
    Mix,
    /// Loud mix with little peak headroom
    HotMix,
    /// Loudness and peaks of a finished master
    MasterTerritory,
}

/// Confidence of the mastered-file verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// At most weak evidence
    Low,
    /// Two indicators, or the true-peak indicator alone
    Medium,
    /// Three or more indicators
    High,
}

/// Evidence that a file has already been mastered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteredIndicator {
    /// True peak above 0 dBTP
    TruePeakOverCeiling,
    /// Sample peak at or above -0.5 dBFS
    MinimalHeadroom,
    /// Integrated loudness above -12 LUFS
    LoudIntegrated,
    /// PLR below 7 dB
    LowPlr,
    /// More than half of the track clips on true peak
    SustainedTruePeakClipping,
}

/// Whether the input looks like a finished master
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteredFileVerdict {
    /// Verdict
    pub is_mastered: bool,
    /// How sure the verdict is
    pub confidence: Confidence,
    /// Indicators that fired
    pub indicators: BTreeSet<MasteredIndicator>,
}

/// Channel layout as heard, not as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoField {
    /// Single channel
    TrueMono,
    /// Two channels carrying identical samples
    PseudoStereo,
    /// Two channels with distinct content
    Stereo,
}

impl StereoField {
    /// Whether the listener hears mono
    pub fn is_mono(self) -> bool {
        !matches!(self, StereoField::Stereo)
    }
}

/// Likely source of a phase problem in a band, for later localization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseCause {
    /// Sub/bass: bass, kick, sidechain tricks
    BassKickSidechain,
    /// Bass-mids: doubled guitars, keys, low vocals
    LowMidInstruments,
    /// Mids: vocals and lead instruments
    VocalsAndLeads,
    /// Mid-highs: chorus, wideners, stereo effects
    StereoEffects,
    /// Highs: cymbals, overheads, reverb tails
    CymbalsAndReverbs,
}

impl From<Band> for PhaseCause {
    fn from(band: Band) -> Self {
        match band {
            Band::SubBass => PhaseCause::BassKickSidechain,
            Band::BassMids => PhaseCause::LowMidInstruments,
            Band::Mids => PhaseCause::VocalsAndLeads,
            Band::MidHighs => PhaseCause::StereoEffects,
            Band::Highs => PhaseCause::CymbalsAndReverbs,
        }
    }
}

/// A band whose correlation is below the problem threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProblemBand {
    /// The band
    pub band: Band,
    /// Its correlation
    pub correlation: f64,
    /// Likely cause
    pub cause: PhaseCause,
}

/// Metric tracked over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionMetric {
    /// L/R correlation
    Correlation,
    /// Side/mid RMS ratio
    MidSide,
    /// L/R balance in dB
    LrBalance,
    /// True peak in dBTP
    TruePeak,
    /// Clipped samples per window
    Clipping,
}

/// What went wrong in a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionIssue {
    /// Negative correlation, cancels in mono
    PhaseCancellation,
    /// Weak but positive correlation
    LowCorrelation,
    /// Side energy approaching or exceeding mid energy
    ExcessiveWidth,
    /// Left channel noticeably louder
    LeftHeavy,
    /// Right channel noticeably louder
    RightHeavy,
    /// Intersample peaks above 0 dBTP
    IntersampleOvers,
    /// True peak within 1 dB of full scale
    NearCeiling,
    /// Samples pinned at full scale
    DigitalClipping,
}

/// Severity of a temporal region
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Minor
    Low,
    /// Noticeable
    Medium,
    /// Serious
    High,
}

/// A contiguous stretch where a metric crossed its problem threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalRegion {
    /// Start time in seconds
    pub start_s: f64,
    /// End time in seconds
    pub end_s: f64,
    /// Metric that triggered the region
    pub metric: RegionMetric,
    /// Average metric value over the region
    pub avg_value: f64,
    /// Issue classification
    pub issue: RegionIssue,
    /// Severity
    pub severity: Severity,
}

impl TemporalRegion {
    /// Length of the region in seconds
    pub fn duration_secs(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Temporal regions grouped by metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalReport {
    /// Regions per metric, each list in time order
    pub regions: BTreeMap<RegionMetric, Vec<TemporalRegion>>,
    /// Percentage (0–100) of windows whose true peak exceeded 0 dBTP
    pub tp_clipping_pct: f64,
    /// Number of windows examined
    pub windows: usize,
}

impl TemporalReport {
    /// Regions for one metric
    pub fn for_metric(&self, metric: RegionMetric) -> &[TemporalRegion] {
        self.regions.get(&metric).map_or(&[], Vec::as_slice)
    }

    /// Total number of regions across metrics
    pub fn len(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    /// Check if no region was found
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete result of analysing one file
///
/// The shape is the same whether the file was measured in one pass or in
/// chunks; `num_chunks` is 1 for a single pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Provenance of the original file
    pub source: SourceInfo,
    /// Threshold table used
    pub mode: ScoringMode,
    /// Raw measurements
    pub metrics: RawMetrics,
    /// Verdict per metric
    pub scores: Vec<ScoredMetric>,
    /// True peak at or above +3 dBTP; the file must not be certified
    pub hard_fail: bool,
    /// Loudness/peak regime
    pub territory: Territory,
    /// Mastered-file verdict
    pub mastered: MasteredFileVerdict,
    /// Channel layout as heard
    pub stereo_field: StereoField,
    /// Bands with weak correlation, worst first
    pub problem_bands: Vec<ProblemBand>,
    /// Problem regions over time
    pub temporal: TemporalReport,
    /// Final score, frozen
    pub final_score: FinalScore,
    /// Number of chunks measured
    pub num_chunks: usize,
}

impl AnalysisReport {
    /// Verdict for one metric, if it was scored
    pub fn score_for(&self, metric: MetricKind) -> Option<&ScoredMetric> {
        self.scores.iter().find(|s| s.name == metric)
    }
}
