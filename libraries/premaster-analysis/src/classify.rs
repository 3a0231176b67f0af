//! Territory and mastered-file classification
//!
//! Both are fixed decision rules over already-measured numbers; neither
//! touches audio.

use premaster_core::{Confidence, MasteredFileVerdict, MasteredIndicator, Territory};
use std::collections::BTreeSet;

/// LUFS above which a file with hot peaks is in master territory
pub const MASTER_LUFS: f64 = -14.5;
/// Peak (sample or true) above which a loud file is in master territory
pub const MASTER_PEAK_DB: f64 = -1.0;
/// True peak that alone puts a file in master territory
pub const MASTER_TRUE_PEAK_DB: f64 = -0.5;
/// LUFS above which a file with hot peaks is a hot mix
pub const HOT_MIX_LUFS: f64 = -16.0;
/// Sample peak above which a loud file is a hot mix
pub const HOT_MIX_PEAK_DB: f64 = -2.0;

/// Classify the loudness/peak regime
///
/// Priority cascade, first match wins:
/// 1. master territory: loud with hot peaks, or true peak above -0.5 dBTP
/// 2. hot mix: above -16 LUFS with peaks above -2 dBFS
/// 3. mix
///
/// Unmeasurable loudness never satisfies a loudness condition, but the
/// true-peak rule still applies.
pub fn detect_territory(lufs: Option<f64>, peak_db: f64, tp_db: f64) -> Territory {
    let louder_than = |limit: f64| lufs.is_some_and(|l| l > limit);

    if (louder_than(MASTER_LUFS) && (peak_db > MASTER_PEAK_DB || tp_db > MASTER_PEAK_DB))
        || tp_db > MASTER_TRUE_PEAK_DB
    {
        Territory::MasterTerritory
    } else if louder_than(HOT_MIX_LUFS) && peak_db > HOT_MIX_PEAK_DB {
        Territory::HotMix
    } else {
        Territory::Mix
    }
}

/// Decide whether the input is already a finished master
///
/// Five indicators are evaluated independently:
///
/// | Indicator | Fires when |
/// |---|---|
/// | true peak over ceiling | `tp_db > 0.0` |
/// | minimal headroom | `peak_db >= -0.5` |
/// | loud integrated | `lufs > -12.0` |
/// | low PLR | `plr < 7.0` |
/// | sustained true-peak clipping | `tp_clipping_pct > 50.0` |
///
/// Three or more: mastered, high confidence. Two, or the true-peak
/// indicator on its own: mastered, medium confidence. Anything else: not
/// mastered, low confidence.
pub fn detect_mastered_file(
    lufs: Option<f64>,
    peak_db: f64,
    tp_db: f64,
    plr: Option<f64>,
    tp_clipping_pct: f64,
) -> MasteredFileVerdict {
    let checks = [
        (MasteredIndicator::TruePeakOverCeiling, tp_db > 0.0),
        (MasteredIndicator::MinimalHeadroom, peak_db >= -0.5),
        (MasteredIndicator::LoudIntegrated, lufs.is_some_and(|l| l > -12.0)),
        (MasteredIndicator::LowPlr, plr.is_some_and(|p| p < 7.0)),
        (
            MasteredIndicator::SustainedTruePeakClipping,
            tp_clipping_pct > 50.0,
        ),
    ];
    let indicators: BTreeSet<MasteredIndicator> = checks
        .into_iter()
        .filter_map(|(indicator, fired)| fired.then_some(indicator))
        .collect();

    let (is_mastered, confidence) = match indicators.len() {
        n if n >= 3 => (true, Confidence::High),
        2 => (true, Confidence::Medium),
        1 if indicators.contains(&MasteredIndicator::TruePeakOverCeiling) => {
            (true, Confidence::Medium)
        }
        _ => (false, Confidence::Low),
    };

    MasteredFileVerdict {
        is_mastered,
        confidence,
        indicators,
    }
}
