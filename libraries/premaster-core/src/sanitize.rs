//! Output sanitization
//!
//! Metric functions floor their denominators, but a report can still carry a
//! non-finite value (an extreme balance, a hand-built `RawMetrics`). JSON has
//! no representation for those, so every float is passed through
//! [`sanitize_f64`] once, when the finished report leaves the engine:
//!
//! | Input | Output |
//! |-------|--------|
//! | `+Inf` | `999.99` |
//! | `-Inf` | `-999.99` |
//! | `NaN` | `0.0` |

use crate::types::{
    AnalysisReport, DcOffset, MasteredFileVerdict, ProblemBand, RawMetrics, ScoredMetric,
    TemporalRegion, TemporalReport,
};
use std::collections::BTreeMap;

/// Replacement for `+Inf`
pub const POSITIVE_INFINITY_SENTINEL: f64 = 999.99;

/// Replacement for `-Inf`
pub const NEGATIVE_INFINITY_SENTINEL: f64 = -999.99;

/// Replacement for `NaN`
pub const NAN_SENTINEL: f64 = 0.0;

/// Map a non-finite float to its sentinel; finite values pass through
pub fn sanitize_f64(value: f64) -> f64 {
    if value.is_nan() {
        NAN_SENTINEL
    } else if value == f64::INFINITY {
        POSITIVE_INFINITY_SENTINEL
    } else if value == f64::NEG_INFINITY {
        NEGATIVE_INFINITY_SENTINEL
    } else {
        value
    }
}

/// Replace non-finite floats in place
pub trait Sanitize {
    /// Sanitize every float reachable from `self`
    ///
    /// Returns how many values were replaced.
    fn sanitize(&mut self) -> usize;
}

impl Sanitize for f64 {
    fn sanitize(&mut self) -> usize {
        if self.is_finite() {
            0
        } else {
            *self = sanitize_f64(*self);
            1
        }
    }
}

impl<T: Sanitize> Sanitize for Option<T> {
    fn sanitize(&mut self) -> usize {
        self.as_mut().map_or(0, Sanitize::sanitize)
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) -> usize {
        self.iter_mut().map(Sanitize::sanitize).sum()
    }
}

impl<K, V: Sanitize> Sanitize for BTreeMap<K, V> {
    fn sanitize(&mut self) -> usize {
        self.values_mut().map(Sanitize::sanitize).sum()
    }
}

impl Sanitize for DcOffset {
    fn sanitize(&mut self) -> usize {
        self.offsets.sanitize() + self.max_offset.sanitize()
    }
}

impl Sanitize for RawMetrics {
    fn sanitize(&mut self) -> usize {
        self.peak_dbfs.sanitize()
            + self.true_peak_dbtp.sanitize()
            + self.lufs.sanitize()
            + self.plr.sanitize()
            + self.crest_factor_db.sanitize()
            + self.correlation.sanitize()
            + self.band_correlations.sanitize()
            + self.ms_ratio.sanitize()
            + self.lr_balance_db.sanitize()
            + self.dc_offset.sanitize()
            + self.duration_secs.sanitize()
    }
}

impl Sanitize for ScoredMetric {
    fn sanitize(&mut self) -> usize {
        self.score_delta.sanitize()
    }
}

impl Sanitize for ProblemBand {
    fn sanitize(&mut self) -> usize {
        self.correlation.sanitize()
    }
}

impl Sanitize for TemporalRegion {
    fn sanitize(&mut self) -> usize {
        self.start_s.sanitize() + self.end_s.sanitize() + self.avg_value.sanitize()
    }
}

impl Sanitize for TemporalReport {
    fn sanitize(&mut self) -> usize {
        self.regions.sanitize() + self.tp_clipping_pct.sanitize()
    }
}

impl Sanitize for MasteredFileVerdict {
    fn sanitize(&mut self) -> usize {
        0
    }
}

impl Sanitize for AnalysisReport {
    fn sanitize(&mut self) -> usize {
        self.metrics.sanitize()
            + self.scores.sanitize()
            + self.mastered.sanitize()
            + self.problem_bands.sanitize()
            + self.temporal.sanitize()
    }
}
