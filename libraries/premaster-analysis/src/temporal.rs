//! Temporal problem detection
//!
//! Audio is cut into fixed windows in file order. Each window is measured
//! once; runs of consecutive problem windows become [`TemporalRegion`]s.
//!
//! Rules:
//! - The first and last [`INTRO_OUTRO_SECONDS`] of the file are ignored
//!   (fades, count-ins and tails are expected to misbehave)
//! - A run must last at least [`REGION_MIN_SECONDS`] to be reported
//! - Windows must be pushed in file order. Chunks may be any length; a
//!   partial window at the end of a chunk is carried into the next one, so
//!   chunked and whole-file runs see identical windows.
//! - Window true peaks come from the chunk's
//!   [`TruePeakScanner`](crate::oversample::TruePeakScanner) envelope, the
//!   same one the chunk fold uses, so interpolation runs once per sample.

use crate::level::count_clipped;
use crate::math::{amplitude_to_db, safe_divide};
use crate::stereo::{balance_from_energy, degenerate_correlation, is_flat, pearson, MidSide};
use premaster_core::{
    AudioBuffer, RegionIssue, RegionMetric, Severity, TemporalRegion, TemporalReport,
};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

/// Shortest run reported as a region
pub const REGION_MIN_SECONDS: f64 = 8.0;

/// Length of the ignored intro and outro
pub const INTRO_OUTRO_SECONDS: f64 = 5.0;

/// True peak above which a window counts toward `tp_clipping_pct`
pub const TRUE_PEAK_CLIP_DBTP: f64 = 0.0;

/// Correlation below which a window is a problem
pub const LOW_CORRELATION: f64 = 0.3;
/// Side/mid ratio above which a window is too wide
pub const WIDE_MS_RATIO: f64 = 0.8;
/// Side/mid ratio above which a wide region is severe
pub const VERY_WIDE_MS_RATIO: f64 = 1.2;
/// |Balance| above which a window leans to one side
pub const UNBALANCED_DB: f64 = 1.5;
/// |Balance| above which an unbalanced region is severe
pub const VERY_UNBALANCED_DB: f64 = 3.0;
/// True peak above which a window is near the ceiling
pub const NEAR_CEILING_DBTP: f64 = -1.0;
/// Mean clipped samples per window above which clipping is severe
pub const HEAVY_CLIPPING_PER_WINDOW: f64 = 10.0;

/// Tolerance for comparing window boundaries in seconds
const TIME_TOLERANCE: f64 = 1e-9;

/// Measurements of one window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    /// Start time in seconds
    pub start_s: f64,
    /// End time in seconds
    pub end_s: f64,
    /// L/R correlation; `None` for one-channel audio
    pub correlation: Option<f64>,
    /// Summed squares of (L+R)/2
    pub mid_energy: f64,
    /// Summed squares of (L-R)/2
    pub side_energy: f64,
    /// Summed squares of L
    pub left_energy: f64,
    /// Summed squares of R
    pub right_energy: f64,
    /// Frames in the window
    pub frames: usize,
    /// Oversampled peak across channels (linear)
    pub true_peak: f64,
    /// Clipped samples across channels
    pub clipped: u64,
}

impl WindowStats {
    /// Measure one window starting at `start_s`, given its true-peak envelope
    pub fn measure(window: &AudioBuffer, true_peaks: &[f64], start_s: f64) -> Self {
        let frames = window.frames();
        let end_s = start_s + window.duration_secs();
        let true_peak = true_peaks.iter().fold(0.0_f64, |acc, &p| acc.max(p));
        let clipped: u64 = window.channels().iter().map(|ch| count_clipped(ch)).sum();

        let mut stats = Self {
            start_s,
            end_s,
            correlation: None,
            mid_energy: 0.0,
            side_energy: 0.0,
            left_energy: 0.0,
            right_energy: 0.0,
            frames,
            true_peak,
            clipped,
        };

        if let Some((left, right)) = window.stereo_pair() {
            stats.correlation = Some(
                pearson(left, right)
                    .unwrap_or_else(|| degenerate_correlation(is_flat(left), is_flat(right))),
            );
            for (&l, &r) in left.iter().zip(right) {
                let m = (l + r) * 0.5;
                let s = (l - r) * 0.5;
                stats.mid_energy += m * m;
                stats.side_energy += s * s;
                stats.left_energy += l * l;
                stats.right_energy += r * r;
            }
        }

        stats
    }

    fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }

    fn is_stereo(&self) -> bool {
        self.correlation.is_some()
    }

    fn ms_ratio(&self) -> f64 {
        MidSide::from_energy(self.mid_energy, self.side_energy, self.frames).ratio
    }

    fn balance_db(&self) -> f64 {
        balance_from_energy(self.left_energy, self.right_energy)
    }

    fn true_peak_db(&self) -> f64 {
        amplitude_to_db(self.true_peak)
    }
}

/// Audio of a partial window plus its true-peak envelope
#[derive(Debug, Clone)]
struct Pending {
    audio: AudioBuffer,
    true_peaks: Vec<f64>,
}

/// Sequential window builder and region finder
#[derive(Debug, Clone)]
pub struct TemporalDetector {
    window_seconds: f64,
    pending: Option<Pending>,
    frames_seen: u64,
    sample_rate: u32,
    windows: Vec<WindowStats>,
}

impl TemporalDetector {
    /// Create a detector with the given window length
    pub fn new(window_seconds: f64) -> Self {
        Self {
            window_seconds,
            pending: None,
            frames_seen: 0,
            sample_rate: 0,
            windows: Vec::new(),
        }
    }

    /// Feed the next stretch of audio, in file order
    ///
    /// `true_peaks` holds one envelope value per frame of `audio`.
    pub fn push(&mut self, audio: &AudioBuffer, true_peaks: &[f64]) {
        if audio.is_empty() {
            return;
        }
        debug_assert_eq!(true_peaks.len(), audio.frames());
        self.sample_rate = audio.sample_rate();
        let window_frames =
            ((self.window_seconds * f64::from(audio.sample_rate())).round() as usize).max(1);

        let carried;
        let (joined, peaks) = match self.pending.take() {
            Some(pending) => {
                let mut peaks = pending.true_peaks;
                peaks.extend_from_slice(true_peaks);
                carried = concat(&pending.audio, audio);
                (&carried, peaks)
            }
            None => (audio, true_peaks.to_vec()),
        };

        let total = joined.frames();
        let envelope = |start: usize, end: usize| peaks.get(start..end).unwrap_or(&[]);
        let mut start = 0;
        while start + window_frames <= total {
            let end = start + window_frames;
            self.close_window(&joined.slice_frames(start, end), envelope(start, end));
            start = end;
        }
        if start < total {
            self.pending = Some(Pending {
                audio: joined.slice_frames(start, total),
                true_peaks: envelope(start, total).to_vec(),
            });
        }
    }

    fn close_window(&mut self, window: &AudioBuffer, true_peaks: &[f64]) {
        let start_s = self.frames_seen as f64 / f64::from(window.sample_rate());
        self.windows
            .push(WindowStats::measure(window, true_peaks, start_s));
        self.frames_seen += window.frames() as u64;
    }

    /// Windows measured so far (a trailing partial window is not included
    /// until [`finish`](Self::finish))
    pub fn windows(&self) -> &[WindowStats] {
        &self.windows
    }

    /// Close the trailing partial window and find regions
    pub fn finish(mut self) -> TemporalReport {
        if let Some(pending) = self.pending.take() {
            self.close_window(&pending.audio, &pending.true_peaks);
        }
        let duration = if self.sample_rate == 0 {
            0.0
        } else {
            self.frames_seen as f64 / f64::from(self.sample_rate)
        };
        let report = find_regions(&self.windows, duration);
        debug!(
            "Temporal pass: {} windows, {} regions, {:.1}% true-peak clipping",
            report.windows,
            report.len(),
            report.tp_clipping_pct
        );
        report
    }
}

fn concat(first: &AudioBuffer, second: &AudioBuffer) -> AudioBuffer {
    let channels: Vec<Vec<f64>> = first
        .channels()
        .iter()
        .zip(second.channels())
        .map(|(a, b)| a.iter().chain(b).copied().collect())
        .collect();
    AudioBuffer::new(channels, second.sample_rate()).unwrap_or_else(|_| second.clone())
}

/// Build the report for a complete, time-ordered window list
pub fn find_regions(windows: &[WindowStats], duration_s: f64) -> TemporalReport {
    let over_ceiling = windows
        .iter()
        .filter(|w| w.true_peak_db() > TRUE_PEAK_CLIP_DBTP)
        .count();
    let tp_clipping_pct = safe_divide(over_ceiling as f64 * 100.0, windows.len() as f64, 0.0);

    let eligible = |w: &WindowStats| {
        w.start_s >= INTRO_OUTRO_SECONDS - TIME_TOLERANCE
            && w.end_s <= duration_s - INTRO_OUTRO_SECONDS + TIME_TOLERANCE
    };

    let mut regions: BTreeMap<RegionMetric, Vec<TemporalRegion>> = BTreeMap::new();
    let mut collect = |metric: RegionMetric,
                       problem: &dyn Fn(&WindowStats) -> bool,
                       summarize: &dyn Fn(&[WindowStats]) -> (f64, RegionIssue, Severity)| {
        for run in runs(windows, &eligible, problem) {
            let run = &windows[run];
            let (Some(first), Some(last)) = (run.first(), run.last()) else {
                continue;
            };
            if last.end_s - first.start_s + TIME_TOLERANCE < REGION_MIN_SECONDS {
                continue;
            }
            let (avg_value, issue, severity) = summarize(run);
            regions.entry(metric).or_default().push(TemporalRegion {
                start_s: first.start_s,
                end_s: last.end_s,
                metric,
                avg_value,
                issue,
                severity,
            });
        }
    };

    collect(
        RegionMetric::Correlation,
        &|w| w.correlation.is_some_and(|c| c < LOW_CORRELATION),
        &|run| {
            let avg = duration_weighted(run, |w| w.correlation.unwrap_or(1.0));
            if avg < 0.0 {
                (avg, RegionIssue::PhaseCancellation, Severity::High)
            } else {
                (avg, RegionIssue::LowCorrelation, Severity::Medium)
            }
        },
    );

    collect(
        RegionMetric::MidSide,
        &|w| w.is_stereo() && w.ms_ratio() > WIDE_MS_RATIO,
        &|run| {
            let (mid, side, frames) = run.iter().fold((0.0, 0.0, 0), |(m, s, n), w| {
                (m + w.mid_energy, s + w.side_energy, n + w.frames)
            });
            let avg = MidSide::from_energy(mid, side, frames).ratio;
            let severity = if avg > VERY_WIDE_MS_RATIO {
                Severity::High
            } else {
                Severity::Medium
            };
            (avg, RegionIssue::ExcessiveWidth, severity)
        },
    );

    let balance_summary = |run: &[WindowStats]| {
        let (left, right) = run
            .iter()
            .fold((0.0, 0.0), |(l, r), w| (l + w.left_energy, r + w.right_energy));
        let avg = balance_from_energy(left, right);
        let issue = if avg > 0.0 {
            RegionIssue::LeftHeavy
        } else {
            RegionIssue::RightHeavy
        };
        let severity = if avg.abs() > VERY_UNBALANCED_DB {
            Severity::High
        } else {
            Severity::Medium
        };
        (avg, issue, severity)
    };
    collect(
        RegionMetric::LrBalance,
        &|w| w.is_stereo() && w.balance_db() > UNBALANCED_DB,
        &balance_summary,
    );
    collect(
        RegionMetric::LrBalance,
        &|w| w.is_stereo() && w.balance_db() < -UNBALANCED_DB,
        &balance_summary,
    );

    collect(
        RegionMetric::TruePeak,
        &|w| w.true_peak_db() > NEAR_CEILING_DBTP,
        &|run| {
            let avg = amplitude_to_db(duration_weighted(run, |w| w.true_peak));
            if avg > TRUE_PEAK_CLIP_DBTP {
                (avg, RegionIssue::IntersampleOvers, Severity::High)
            } else {
                (avg, RegionIssue::NearCeiling, Severity::Low)
            }
        },
    );

    collect(
        RegionMetric::Clipping,
        &|w| w.clipped > 0,
        &|run| {
            let avg = safe_divide(
                run.iter().map(|w| w.clipped as f64).sum(),
                run.len() as f64,
                0.0,
            );
            let severity = if avg > HEAVY_CLIPPING_PER_WINDOW {
                Severity::High
            } else {
                Severity::Medium
            };
            (avg, RegionIssue::DigitalClipping, severity)
        },
    );

    if let Some(balance) = regions.get_mut(&RegionMetric::LrBalance) {
        balance.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
    }

    TemporalReport {
        regions,
        tp_clipping_pct,
        windows: windows.len(),
    }
}

/// Index ranges of consecutive eligible problem windows
fn runs(
    windows: &[WindowStats],
    eligible: &dyn Fn(&WindowStats) -> bool,
    problem: &dyn Fn(&WindowStats) -> bool,
) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut open: Option<usize> = None;
    for (i, window) in windows.iter().enumerate() {
        let hit = eligible(window) && problem(window);
        match (open, hit) {
            (None, true) => open = Some(i),
            (Some(start), false) => {
                found.push(start..i);
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        found.push(start..windows.len());
    }
    found
}

fn duration_weighted(run: &[WindowStats], value: impl Fn(&WindowStats) -> f64) -> f64 {
    let (sum, weight) = run.iter().fold((0.0, 0.0), |(s, d), w| {
        (s + value(w) * w.duration_s(), d + w.duration_s())
    });
    safe_divide(sum, weight, 0.0)
}
