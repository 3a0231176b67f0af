//! End-to-end mastering-readiness tests
//!
//! Synthetic signals with known properties are run through `MixAnalyzer`:
//! - Chunked and whole-file analysis agree, including true peaks and
//!   temporal regions that straddle a chunk cut
//! - Silence is reported as unmeasurable, never as a plausible number
//! - Identical channels are flagged as pseudo-stereo
//! - Bands without energy report no correlation
//! - Stereo correlation lands in the expected scoring tier
//! - Short files never produce a PLR

use premaster_analysis::loudness::{LoudnessAccumulator, MeterBackend};
use premaster_analysis::{AnalysisConfig, MixAnalyzer};
use premaster_core::{
    AnalysisReport, AudioBuffer, Band, LoudnessMethod, MetricKind, RegionMetric, SourceInfo,
    Status, StereoField,
};
use std::f64::consts::PI;

const RATE: u32 = 44_100;

// ============================================================================
// Test Signal Generators
// ============================================================================

/// Sine with whole cycles per second at 44.1 kHz (441 Hz = 100 samples/cycle)
fn sine(freq: f64, amplitude: f64, phase: f64, seconds: f64) -> Vec<f64> {
    let n = (seconds * f64::from(RATE)) as usize;
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / f64::from(RATE) + phase).sin())
        .collect()
}

/// Stereo pair whose L/R correlation is `target`
fn correlated_pair(target: f64, amplitude: f64, seconds: f64) -> AudioBuffer {
    let phase = target.clamp(-1.0, 1.0).acos();
    AudioBuffer::new(
        vec![
            sine(441.0, amplitude, 0.0, seconds),
            sine(441.0, amplitude, phase, seconds),
        ],
        RATE,
    )
    .unwrap()
}

/// Linear fade-in over `seconds`
fn fade_in(mut samples: Vec<f64>, seconds: f64) -> Vec<f64> {
    let fade = (seconds * f64::from(RATE)) as usize;
    for (i, s) in samples.iter_mut().take(fade).enumerate() {
        *s *= i as f64 / fade as f64;
    }
    samples
}

fn analyzer(meter: MeterBackend) -> MixAnalyzer {
    MixAnalyzer::new(AnalysisConfig {
        meter,
        ..AnalysisConfig::default()
    })
    .unwrap()
}

fn status(report: &AnalysisReport, metric: MetricKind) -> Status {
    report.score_for(metric).map(|s| s.status).unwrap()
}

// ============================================================================
// Chunk / whole-file parity
// ============================================================================

fn assert_parity(meter: MeterBackend) {
    let buffer = correlated_pair(0.82, 0.3, 23.0);
    let analyzer = analyzer(meter);

    let whole = analyzer
        .analyze(&buffer, SourceInfo::named("parity.wav"))
        .unwrap();
    let chunked = analyzer
        .analyze_chunked(buffer.chunks(5.0), SourceInfo::named("parity.wav"))
        .unwrap();

    assert_eq!(whole.num_chunks, 1);
    assert_eq!(chunked.num_chunks, 5);

    let (w, c) = (&whole.metrics, &chunked.metrics);
    assert!((w.peak_dbfs - c.peak_dbfs).abs() < 0.1);
    assert!((w.true_peak_dbtp - c.true_peak_dbtp).abs() < 0.1);
    assert!((w.lufs.unwrap() - c.lufs.unwrap()).abs() < 0.1);
    assert!((w.plr.unwrap() - c.plr.unwrap()).abs() < 0.1);
    assert!((w.crest_factor_db - c.crest_factor_db).abs() < 0.1);
    assert!((w.lr_balance_db - c.lr_balance_db).abs() < 0.1);
    assert!((w.correlation - c.correlation).abs() < 0.01);
    assert!((w.ms_ratio - c.ms_ratio).abs() < 0.01);
    assert_eq!(w.lufs_reliable, c.lufs_reliable);
    assert_eq!(w.lufs_method, c.lufs_method);

    let statuses = |r: &AnalysisReport| r.scores.iter().map(|s| (s.name, s.status)).collect::<Vec<_>>();
    assert_eq!(statuses(&whole), statuses(&chunked));
    assert_eq!(whole.final_score, chunked.final_score);
    assert_eq!(whole.territory, chunked.territory);
    assert_eq!(whole.stereo_field, chunked.stereo_field);
    assert_eq!(whole.temporal, chunked.temporal);
}

#[test]
fn test_true_peak_across_chunk_cut() {
    // Quiet bed plus an fs/4 burst, sampled 45° off its crest, spanning the 5 s cut
    let cut = 5 * RATE as usize;
    let mut mono = sine(441.0, 0.05, 0.0, 12.0);
    for (k, s) in mono[cut - 4..cut + 4].iter_mut().enumerate() {
        *s += 1.26 * (PI / 2.0 * k as f64 + PI / 4.0).sin();
    }
    let buffer = AudioBuffer::new(vec![mono.clone(), mono], RATE).unwrap();
    let analyzer = analyzer(MeterBackend::RmsFallback);

    let whole = analyzer
        .analyze(&buffer, SourceInfo::named("burst.wav"))
        .unwrap();
    let chunked = analyzer
        .analyze_chunked(buffer.chunks(5.0), SourceInfo::named("burst.wav"))
        .unwrap();

    // Samples stay under 0 dBFS; only the reconstruction goes over
    assert!(whole.metrics.peak_dbfs < 0.0);
    assert!(whole.metrics.true_peak_dbtp > 0.0);
    assert_eq!(whole.metrics.true_peak_dbtp, chunked.metrics.true_peak_dbtp);
    assert_eq!(status(&chunked, MetricKind::TruePeak), Status::Critical);
    assert_eq!(whole.final_score, chunked.final_score);
    assert_eq!(whole.temporal, chunked.temporal);
}

#[test]
fn test_temporal_regions_match_across_chunking() {
    // Right channel inverted from 10 s to 22 s; 5 s chunks cut through it
    let left = sine(441.0, 0.3, 0.0, 32.0);
    let right = left
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let t = i as f64 / f64::from(RATE);
            if (10.0..22.0).contains(&t) {
                -s
            } else {
                s
            }
        })
        .collect();
    let buffer = AudioBuffer::new(vec![left, right], RATE).unwrap();
    let analyzer = analyzer(MeterBackend::RmsFallback);

    let whole = analyzer
        .analyze(&buffer, SourceInfo::named("flip.wav"))
        .unwrap();
    let chunked = analyzer
        .analyze_chunked(buffer.chunks(5.0), SourceInfo::named("flip.wav"))
        .unwrap();

    let regions = whole.temporal.for_metric(RegionMetric::Correlation);
    assert_eq!(regions.len(), 1);
    assert!((regions[0].start_s - 10.0).abs() < 1e-9);
    assert!((regions[0].end_s - 22.0).abs() < 1e-9);
    assert_eq!(whole.temporal, chunked.temporal);
    assert_eq!(whole.temporal.windows, 32);
}

#[test]
fn test_chunked_matches_whole_file_rms() {
    assert_parity(MeterBackend::RmsFallback);
}

#[cfg(feature = "r128")]
#[test]
fn test_chunked_matches_whole_file_r128() {
    assert_parity(MeterBackend::R128);
}

#[test]
fn test_energy_domain_loudness_combination() {
    let mut acc = LoudnessAccumulator::new();
    acc.add(Some(-8.0), 5.0, LoudnessMethod::EbuR128);
    acc.add(Some(-12.0), 5.0, LoudnessMethod::EbuR128);
    let lufs = acc.finish().lufs.unwrap();

    let expected = 10.0 * ((10f64.powf(-0.8) + 10f64.powf(-1.2)) / 2.0).log10();
    assert!((lufs - expected).abs() < 1e-9);
    assert!((lufs - (-9.6)).abs() < 0.05);
    assert!((lufs - (-10.0)).abs() > 0.3, "must not be the dB average");
}

// ============================================================================
// Silence
// ============================================================================

#[test]
fn test_silence_is_unmeasurable() {
    let silent = AudioBuffer::new(vec![vec![0.0; 10 * RATE as usize]; 2], RATE).unwrap();
    let report = MixAnalyzer::new(AnalysisConfig::default())
        .unwrap()
        .analyze(&silent, SourceInfo::named("silence.wav"))
        .unwrap();

    let m = &report.metrics;
    assert_eq!(m.lufs, None);
    assert!(!m.lufs_reliable);
    assert_eq!(m.plr, None);
    assert_eq!(m.peak_dbfs, -120.0);
    assert_eq!(m.true_peak_dbtp, -120.0);
    assert!(m.band_correlations.values().all(Option::is_none));
    assert_eq!(report.stereo_field, StereoField::PseudoStereo);
    assert!(!report.hard_fail);
    assert!(report.final_score.value() >= 10);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"lufs\":null"));
}

#[test]
fn test_silence_chunked() {
    let silent = AudioBuffer::new(vec![vec![0.0; 12 * RATE as usize]; 2], RATE).unwrap();
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze_chunked(silent.chunks(5.0), SourceInfo::named("silence.wav"))
        .unwrap();
    assert_eq!(report.metrics.lufs, None);
    assert!(!report.metrics.lufs_reliable);
    assert_eq!(report.metrics.plr, None);
}

// ============================================================================
// Mono detection
// ============================================================================

#[test]
fn test_identical_channels_are_pseudo_stereo() {
    let ch = sine(441.0, 0.4, 0.0, 4.0);
    let buffer = AudioBuffer::new(vec![ch.clone(), ch], RATE).unwrap();
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&buffer, SourceInfo::named("mono.wav"))
        .unwrap();

    assert!((report.metrics.correlation - 1.0).abs() < 1e-9);
    assert_eq!(report.stereo_field, StereoField::PseudoStereo);
    assert!(report.stereo_field.is_mono());
}

#[test]
fn test_healthy_stereo_is_not_mono() {
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&correlated_pair(0.85, 0.4, 4.0), SourceInfo::named("wide.wav"))
        .unwrap();

    let c = report.metrics.correlation;
    assert!((0.75..=0.95).contains(&c), "correlation {c}");
    assert_eq!(report.stereo_field, StereoField::Stereo);
    assert!(!report.stereo_field.is_mono());
}

#[test]
fn test_single_channel_skips_balance() {
    let buffer = AudioBuffer::new(vec![sine(441.0, 0.4, 0.0, 4.0)], RATE).unwrap();
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&buffer, SourceInfo::named("mono.wav"))
        .unwrap();

    assert_eq!(report.stereo_field, StereoField::TrueMono);
    assert!(report.score_for(MetricKind::LrBalance).is_none());
    assert_eq!(report.scores.len(), 5);
}

// ============================================================================
// Band correlation
// ============================================================================

#[test]
fn test_band_without_energy_is_none() {
    let left = fade_in(
        sine(700.0, 0.3, 0.0, 3.0)
            .into_iter()
            .zip(sine(1_400.0, 0.2, 0.0, 3.0))
            .map(|(a, b)| a + b)
            .collect(),
        0.05,
    );
    let right = fade_in(
        sine(700.0, 0.3, 0.4, 3.0)
            .into_iter()
            .zip(sine(1_400.0, 0.2, 0.4, 3.0))
            .map(|(a, b)| a + b)
            .collect(),
        0.05,
    );
    let buffer = AudioBuffer::new(vec![left, right], RATE).unwrap();
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&buffer, SourceInfo::named("mids.wav"))
        .unwrap();

    let bands = &report.metrics.band_correlations;
    assert_eq!(bands[&Band::SubBass], None);
    assert_eq!(bands[&Band::Highs], None);
    let mids = bands[&Band::Mids].unwrap();
    assert!((-1.0..=1.0).contains(&mids));
    assert!(mids > 0.8);
    assert!(report.problem_bands.iter().all(|p| p.band != Band::SubBass));
}

#[test]
fn test_phase_inverted_band_is_a_problem() {
    // Bass inverted on the right, mids in phase
    let bass_l = sine(80.0, 0.3, 0.0, 3.0);
    let bass_r: Vec<f64> = bass_l.iter().map(|s| -s).collect();
    let mids = sine(1_000.0, 0.3, 0.0, 3.0);
    let mix = |a: &[f64]| -> Vec<f64> {
        fade_in(a.iter().zip(&mids).map(|(x, y)| x + y).collect(), 0.05)
    };
    let buffer = AudioBuffer::new(vec![mix(&bass_l), mix(&bass_r)], RATE).unwrap();
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&buffer, SourceInfo::named("bass.wav"))
        .unwrap();

    let worst = report.problem_bands.first().unwrap();
    assert_eq!(worst.band, Band::SubBass);
    assert!(worst.correlation < -0.9);
}

// ============================================================================
// Scoring
// ============================================================================

#[test]
fn test_stereo_boundary_table() {
    let analyzer = analyzer(MeterBackend::RmsFallback);
    let cases = [
        (0.75, Status::Perfect),
        (0.6, Status::Pass),
        (0.4, Status::Warning),
        (0.2, Status::Poor),
        (0.05, Status::Critical),
        (-0.3, Status::Catastrophic),
    ];
    for (target, expected) in cases {
        let report = analyzer
            .analyze(&correlated_pair(target, 0.3, 2.0), SourceInfo::named("tier.wav"))
            .unwrap();
        assert!((report.metrics.correlation - target).abs() < 1e-3);
        assert_eq!(
            status(&report, MetricKind::StereoCorrelation),
            expected,
            "correlation {target}"
        );
    }
}

#[test]
fn test_catastrophic_stereo_sets_floor() {
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&correlated_pair(-0.8, 0.3, 4.0), SourceInfo::named("inverted.wav"))
        .unwrap();
    assert_eq!(status(&report, MetricKind::StereoCorrelation), Status::Catastrophic);
    assert_eq!(report.final_score.floor(), 15);
    assert!(report.final_score.value() >= 15);
}

#[test]
fn test_short_file_has_no_plr() {
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&correlated_pair(0.8, 0.5, 2.0), SourceInfo::named("short.wav"))
        .unwrap();

    assert!(report.metrics.lufs.is_some());
    assert!(!report.metrics.lufs_reliable);
    assert_eq!(report.metrics.plr, None);

    let plr = report.score_for(MetricKind::Plr).unwrap();
    assert_eq!(plr.status, Status::Pass);
    assert_eq!(plr.score_delta, 0.5);
}

#[test]
fn test_hot_master_is_detected() {
    // Full-scale square-ish wave: clipped, true peak over the ceiling
    let n = 30 * RATE as usize;
    let hot: Vec<f64> = sine(441.0, 1.6, 0.0, 30.0)
        .into_iter()
        .map(|s| s.clamp(-1.0, 1.0))
        .collect();
    assert_eq!(hot.len(), n);
    let right: Vec<f64> = hot.iter().map(|s| s * 0.98).collect();
    let buffer = AudioBuffer::new(vec![hot, right], RATE).unwrap();
    let report = analyzer(MeterBackend::RmsFallback)
        .analyze(&buffer, SourceInfo::named("master.wav"))
        .unwrap();

    assert!(report.metrics.clipped_samples > 0);
    assert_eq!(status(&report, MetricKind::Headroom), Status::Critical);
    assert!(report.mastered.is_mastered);
    assert_eq!(
        report.territory,
        premaster_core::Territory::MasterTerritory
    );
    assert!(!report.temporal.for_metric(RegionMetric::Clipping).is_empty());
}
