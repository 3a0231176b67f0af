//! Threshold scoring
//!
//! Every metric has one ordered rule table per [`ScoringMode`]. A value is
//! scored by the first rule whose predicate holds; when none does (including
//! `NaN`), it falls through to `conservative`. Tables are immutable statics.
//!
//! ```text
//!   value ─► critical? ─► warning? ─► perfect? ─► pass? ─► conservative
//!               │            │           │          │
//!               ▼            ▼           ▼          ▼
//!            (status, delta)  first match wins
//! ```
//!
//! The per-metric deltas are folded into a 0–100 score with
//! [`final_score`], which is never allowed below the floor from
//! [`calculate_minimum_score`].

use crate::math::safe_divide;
use premaster_core::{FinalScore, MetricKind, RawMetrics, ScoredMetric, ScoringMode, Status};
use tracing::debug;

/// True peak at or above which the file must not be certified
pub const TRUE_PEAK_HARD_FAIL_DBTP: f64 = 3.0;

/// Score every metric starts from
pub const SCORE_BASELINE: f64 = 50.0;

/// Combined weight of all six metric families
pub const FULL_WEIGHT: f64 = 50.0;

/// One row of a threshold table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Status assigned when the predicate holds
    pub status: Status,
    /// Score delta for that status
    pub delta: f64,
    applies: fn(f64) -> bool,
}

impl Rule {
    const fn new(status: Status, applies: fn(f64) -> bool) -> Self {
        Self {
            status,
            delta: status.default_delta(),
            applies,
        }
    }

    const fn with_delta(status: Status, delta: f64, applies: fn(f64) -> bool) -> Self {
        Self {
            status,
            delta,
            applies,
        }
    }

    /// Whether this rule matches `value`
    pub fn matches(&self, value: f64) -> bool {
        (self.applies)(value)
    }
}

static HEADROOM_NORMAL: [Rule; 4] = [
    Rule::new(Status::Critical, |db| db > -1.0),
    Rule::new(Status::Warning, |db| db > -3.0),
    Rule::new(Status::Perfect, |db| (-6.0..=-3.0).contains(&db)),
    Rule::new(Status::Pass, |db| (-12.0..-6.0).contains(&db)),
];

static HEADROOM_STRICT: [Rule; 4] = [
    Rule::new(Status::Critical, |db| db > -2.0),
    Rule::new(Status::Warning, |db| db > -4.0),
    Rule::new(Status::Perfect, |db| (-6.0..=-4.0).contains(&db)),
    Rule::new(Status::Pass, |db| (-10.0..-6.0).contains(&db)),
];

static TRUE_PEAK_NORMAL: [Rule; 4] = [
    Rule::new(Status::Critical, |db| db > 0.0),
    Rule::with_delta(Status::Warning, 0.4, |db| db > -1.0),
    Rule::new(Status::Perfect, |db| (-6.0..=-3.0).contains(&db)),
    Rule::new(Status::Pass, |db| db > -3.0),
];

static TRUE_PEAK_STRICT: [Rule; 4] = [
    Rule::new(Status::Critical, |db| db > -0.5),
    Rule::with_delta(Status::Warning, 0.3, |db| db > -2.0),
    Rule::new(Status::Perfect, |db| (-6.0..=-3.0).contains(&db)),
    Rule::new(Status::Pass, |db| db > -3.0),
];

static PLR_NORMAL: [Rule; 4] = [
    Rule::with_delta(Status::Critical, -0.5, |db| db < 6.0),
    Rule::with_delta(Status::Warning, 0.3, |db| db < 8.0),
    Rule::new(Status::Perfect, |db| (12.0..=20.0).contains(&db)),
    Rule::new(Status::Pass, |db| (8.0..12.0).contains(&db)),
];

static PLR_STRICT: [Rule; 4] = [
    Rule::with_delta(Status::Critical, -0.5, |db| db < 8.0),
    Rule::with_delta(Status::Warning, 0.3, |db| db < 10.0),
    Rule::new(Status::Perfect, |db| (14.0..=22.0).contains(&db)),
    Rule::new(Status::Pass, |db| (10.0..14.0).contains(&db)),
];

static STEREO_NORMAL: [Rule; 6] = [
    Rule::new(Status::Catastrophic, |c| c < 0.0),
    Rule::new(Status::Critical, |c| c < 0.1),
    Rule::new(Status::Poor, |c| c < 0.3),
    Rule::new(Status::Warning, |c| c < 0.5),
    Rule::new(Status::Perfect, |c| (0.7..=0.95).contains(&c)),
    Rule::new(Status::Pass, |c| (0.5..0.7).contains(&c)),
];

static STEREO_STRICT: [Rule; 6] = [
    Rule::new(Status::Catastrophic, |c| c < 0.0),
    Rule::new(Status::Critical, |c| c < 0.15),
    Rule::new(Status::Poor, |c| c < 0.35),
    Rule::new(Status::Warning, |c| c < 0.55),
    Rule::new(Status::Perfect, |c| (0.75..=0.95).contains(&c)),
    Rule::new(Status::Pass, |c| (0.55..0.75).contains(&c)),
];

static BALANCE_NORMAL: [Rule; 4] = [
    Rule::new(Status::Critical, |db| db > 3.0),
    Rule::new(Status::Warning, |db| db > 1.5),
    Rule::new(Status::Perfect, |db| db <= 0.5),
    Rule::new(Status::Pass, |db| db <= 1.5),
];

static BALANCE_STRICT: [Rule; 4] = [
    Rule::new(Status::Critical, |db| db > 2.0),
    Rule::new(Status::Warning, |db| db > 1.0),
    Rule::new(Status::Perfect, |db| db <= 0.3),
    Rule::new(Status::Pass, |db| db <= 1.0),
];

static DC_OFFSET: [Rule; 4] = [
    Rule::new(Status::Critical, |dc| dc > 0.05),
    Rule::new(Status::Warning, |dc| dc > 0.01),
    Rule::new(Status::Perfect, |dc| dc <= 0.001),
    Rule::new(Status::Pass, |dc| dc <= 0.01),
];

/// Threshold table for a metric
pub fn rules(metric: MetricKind, mode: ScoringMode) -> &'static [Rule] {
    match (metric, mode) {
        (MetricKind::Headroom, ScoringMode::Normal) => &HEADROOM_NORMAL,
        (MetricKind::Headroom, ScoringMode::Strict) => &HEADROOM_STRICT,
        (MetricKind::TruePeak, ScoringMode::Normal) => &TRUE_PEAK_NORMAL,
        (MetricKind::TruePeak, ScoringMode::Strict) => &TRUE_PEAK_STRICT,
        (MetricKind::Plr, ScoringMode::Normal) => &PLR_NORMAL,
        (MetricKind::Plr, ScoringMode::Strict) => &PLR_STRICT,
        (MetricKind::StereoCorrelation, ScoringMode::Normal) => &STEREO_NORMAL,
        (MetricKind::StereoCorrelation, ScoringMode::Strict) => &STEREO_STRICT,
        (MetricKind::LrBalance, ScoringMode::Normal) => &BALANCE_NORMAL,
        (MetricKind::LrBalance, ScoringMode::Strict) => &BALANCE_STRICT,
        (MetricKind::DcOffset, _) => &DC_OFFSET,
    }
}

/// Score a value against a metric's table
pub fn evaluate(metric: MetricKind, mode: ScoringMode, value: f64) -> ScoredMetric {
    let (status, score_delta) = rules(metric, mode)
        .iter()
        .find(|rule| rule.matches(value))
        .map_or(
            (Status::Conservative, Status::Conservative.default_delta()),
            |rule| (rule.status, rule.delta),
        );
    ScoredMetric {
        name: metric,
        status,
        score_delta,
        mode,
    }
}

/// Score sample-peak headroom
pub fn score_headroom(peak_dbfs: f64, mode: ScoringMode) -> ScoredMetric {
    evaluate(MetricKind::Headroom, mode, peak_dbfs)
}

/// Score the true peak; the flag is the hard-fail condition
pub fn score_true_peak(true_peak_dbtp: f64, mode: ScoringMode) -> (ScoredMetric, bool) {
    (
        evaluate(MetricKind::TruePeak, mode, true_peak_dbtp),
        true_peak_dbtp >= TRUE_PEAK_HARD_FAIL_DBTP,
    )
}

/// Score the peak-to-loudness ratio
///
/// Without a trustworthy loudness the ratio cannot be judged, and scores
/// `pass` with a reduced delta of 0.5.
pub fn score_plr(plr: Option<f64>, lufs_reliable: bool, mode: ScoringMode) -> ScoredMetric {
    match plr {
        Some(plr) if lufs_reliable => evaluate(MetricKind::Plr, mode, plr),
        _ => ScoredMetric {
            name: MetricKind::Plr,
            status: Status::Pass,
            score_delta: 0.5,
            mode,
        },
    }
}

/// Score stereo correlation
pub fn score_stereo(correlation: f64, mode: ScoringMode) -> ScoredMetric {
    evaluate(MetricKind::StereoCorrelation, mode, correlation)
}

/// Score L/R balance; the sign does not matter
pub fn score_balance(balance_db: f64, mode: ScoringMode) -> ScoredMetric {
    evaluate(MetricKind::LrBalance, mode, balance_db.abs())
}

/// Score the largest per-channel DC offset
pub fn score_dc_offset(max_offset: f64, mode: ScoringMode) -> ScoredMetric {
    evaluate(MetricKind::DcOffset, mode, max_offset.abs())
}

/// Score every metric of a measurement
///
/// One-channel input has no balance to score. Returns the scores in a fixed
/// order plus the true-peak hard-fail flag.
pub fn score_metrics(metrics: &RawMetrics, mode: ScoringMode) -> (Vec<ScoredMetric>, bool) {
    let (true_peak, hard_fail) = score_true_peak(metrics.true_peak_dbtp, mode);

    let mut scores = vec![
        score_headroom(metrics.peak_dbfs, mode),
        true_peak,
        score_plr(metrics.plr, metrics.lufs_reliable, mode),
        score_stereo(metrics.correlation, mode),
    ];
    if metrics.channels > 1 {
        scores.push(score_balance(metrics.lr_balance_db, mode));
    }
    scores.push(score_dc_offset(metrics.dc_offset.max_offset, mode));

    (scores, hard_fail)
}

/// Lowest score a set of verdicts may receive
///
/// | Condition | Floor |
/// |---|---|
/// | ≥ 2 catastrophic | 10 |
/// | 1 catastrophic | 15 |
/// | ≥ 3 critical | 20 |
/// | 2 critical | 25 |
/// | 1 critical | 35 |
/// | otherwise | 50 |
pub fn calculate_minimum_score(scores: &[ScoredMetric]) -> u8 {
    let count = |status: Status| scores.iter().filter(|s| s.status == status).count();
    let catastrophic = count(Status::Catastrophic);
    let critical = count(Status::Critical);

    match (catastrophic, critical) {
        (c, _) if c >= 2 => 10,
        (1, _) => 15,
        (_, c) if c >= 3 => 20,
        (_, 2) => 25,
        (_, 1) => 35,
        _ => 50,
    }
}

/// Contribution weight of a metric family
pub fn metric_weight(metric: MetricKind) -> f64 {
    match metric {
        MetricKind::Headroom
        | MetricKind::TruePeak
        | MetricKind::Plr
        | MetricKind::StereoCorrelation => 10.0,
        MetricKind::LrBalance | MetricKind::DcOffset => 5.0,
    }
}

/// Fold verdicts into the final 0–100 score
///
/// Weighted deltas are rescaled to [`FULL_WEIGHT`], so a file with fewer
/// verdicts (one channel has no balance) spans the same range.
pub fn final_score(scores: &[ScoredMetric]) -> FinalScore {
    let (weighted, weight) = scores.iter().fold((0.0, 0.0), |(sum, w), s| {
        let weight = metric_weight(s.name);
        (sum + s.score_delta * weight, w + weight)
    });
    let raw = SCORE_BASELINE + safe_divide(weighted * FULL_WEIGHT, weight, 0.0);
    let floor = calculate_minimum_score(scores);
    debug!("Raw score {:.2}, floor {}", raw, floor);
    FinalScore::clamped(raw, floor)
}
