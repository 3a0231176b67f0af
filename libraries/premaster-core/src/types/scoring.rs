/// Scoring types
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scoring strictness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Standard thresholds
    #[default]
    Normal,
    /// Uniformly more demanding thresholds
    Strict,
}

impl ScoringMode {
    /// Parse from string for settings persistence
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" | "standard" => Some(Self::Normal),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Strict => "strict",
        }
    }
}

/// Categorical verdict for one metric
///
/// Declared from worst to best-but-cautious; `Ord` follows declaration order,
/// so `Catastrophic < Critical < ... < Conservative`. Use [`Status::severity`]
/// when ranking how bad a status is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Qualitatively broken (e.g. phase-inverted stereo)
    Catastrophic,
    /// Must be fixed before mastering
    Critical,
    /// Clearly below par
    Poor,
    /// Worth a look
    Warning,
    /// Acceptable
    Pass,
    /// Ideal range
    Perfect,
    /// Safe but overly cautious (e.g. very low peaks)
    Conservative,
}

impl Status {
    /// Score delta from the shared table
    ///
    /// Some metrics override individual entries (true-peak warning, PLR
    /// warning/critical); the tables in the scoring engine carry those.
    pub const fn default_delta(self) -> f64 {
        match self {
            Status::Catastrophic => -2.0,
            Status::Critical => -1.0,
            Status::Poor => -0.3,
            Status::Warning => 0.0,
            Status::Pass => 0.7,
            Status::Perfect => 1.0,
            Status::Conservative => 0.4,
        }
    }

    /// Severity rank, 0 (fine) to 4 (catastrophic)
    pub fn severity(self) -> u8 {
        match self {
            Status::Catastrophic => 4,
            Status::Critical => 3,
            Status::Poor => 2,
            Status::Warning => 1,
            Status::Pass | Status::Perfect | Status::Conservative => 0,
        }
    }

    /// Stable identifier, matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Catastrophic => "catastrophic",
            Status::Critical => "critical",
            Status::Poor => "poor",
            Status::Warning => "warning",
            Status::Pass => "pass",
            Status::Perfect => "perfect",
            Status::Conservative => "conservative",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric family being scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Sample-peak headroom
    Headroom,
    /// Intersample peak
    TruePeak,
    /// Peak-to-loudness ratio
    Plr,
    /// Stereo width / phase coherence
    StereoCorrelation,
    /// Left/right level balance
    LrBalance,
    /// DC offset
    DcOffset,
}

impl MetricKind {
    /// Stable identifier, matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Headroom => "headroom",
            MetricKind::TruePeak => "true_peak",
            MetricKind::Plr => "plr",
            MetricKind::StereoCorrelation => "stereo_correlation",
            MetricKind::LrBalance => "lr_balance",
            MetricKind::DcOffset => "dc_offset",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one raw metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredMetric {
    /// Which metric was scored
    pub name: MetricKind,
    /// Categorical status
    pub status: Status,
    /// Contribution to the final score, in status units
    pub score_delta: f64,
    /// Threshold table used
    pub mode: ScoringMode,
}

/// Final 0–100 score with its floor
///
/// Constructed only by the scoring engine. There are no setters: once a
/// score exists it is frozen, and text generation downstream can only read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinalScore {
    value: u8,
    floor: u8,
}

impl FinalScore {
    /// Build a score, clamping into `[floor, 100]`
    pub fn clamped(raw: f64, floor: u8) -> Self {
        let floor = floor.min(100);
        let value = if raw.is_nan() {
            floor
        } else {
            raw.round().clamp(f64::from(floor), 100.0) as u8
        };
        Self { value, floor }
    }

    /// The score
    pub fn value(&self) -> u8 {
        self.value
    }

    /// The floor that applied
    pub fn floor(&self) -> u8 {
        self.floor
    }
}

impl fmt::Display for FinalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/100", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_orders_statuses() {
        assert!(Status::Catastrophic.severity() > Status::Critical.severity());
        assert!(Status::Critical.severity() > Status::Poor.severity());
        assert_eq!(Status::Perfect.severity(), 0);
    }

    #[test]
    fn test_final_score_clamps() {
        assert_eq!(FinalScore::clamped(-40.0, 25).value(), 25);
        assert_eq!(FinalScore::clamped(140.0, 50).value(), 100);
        assert_eq!(FinalScore::clamped(72.4, 10).value(), 72);
        assert_eq!(FinalScore::clamped(f64::NAN, 35).value(), 35);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(ScoringMode::from_str("STRICT"), Some(ScoringMode::Strict));
        assert_eq!(ScoringMode::from_str("normal"), Some(ScoringMode::Normal));
        assert_eq!(ScoringMode::from_str("loose"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&Status::Catastrophic).unwrap();
        assert_eq!(json, "\"catastrophic\"");
    }
}
