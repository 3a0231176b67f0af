//! Property-based tests for scoring and reduction
//!
//! These tests use proptest to verify invariants across many random inputs.

use premaster_analysis::chunk::ChunkAggregator;
use premaster_analysis::loudness::{LoudnessAccumulator, LoudnessMeter, MeterBackend};
use premaster_analysis::oversample::TruePeakScanner;
use premaster_analysis::scoring::{calculate_minimum_score, final_score};
use premaster_analysis::ChunkPartial;
use premaster_core::{AudioBuffer, LoudnessMethod, MetricKind, ScoredMetric, ScoringMode, Status};
use proptest::prelude::*;

const KINDS: [MetricKind; 6] = [
    MetricKind::Headroom,
    MetricKind::TruePeak,
    MetricKind::Plr,
    MetricKind::StereoCorrelation,
    MetricKind::LrBalance,
    MetricKind::DcOffset,
];

const STATUSES: [Status; 7] = [
    Status::Catastrophic,
    Status::Critical,
    Status::Poor,
    Status::Warning,
    Status::Pass,
    Status::Perfect,
    Status::Conservative,
];

// Helper: build verdicts from status indices
fn verdicts(indices: &[usize]) -> Vec<ScoredMetric> {
    KINDS
        .iter()
        .zip(indices)
        .map(|(&name, &i)| {
            let status = STATUSES[i % STATUSES.len()];
            ScoredMetric {
                name,
                status,
                score_delta: status.default_delta(),
                mode: ScoringMode::Normal,
            }
        })
        .collect()
}

// Helper: deterministic LCG noise in [-amplitude, amplitude]
fn noise(seed: u64, len: usize, amplitude: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            amplitude * (2.0 * unit - 1.0)
        })
        .collect()
}

proptest! {
    /// Property: the score never drops below 10, and only reaches 10 with
    /// at least two catastrophic verdicts
    #[test]
    fn score_floor_invariant(indices in prop::collection::vec(0usize..7, 6)) {
        let scores = verdicts(&indices);
        let score = final_score(&scores);
        let catastrophic = scores.iter().filter(|s| s.status == Status::Catastrophic).count();

        prop_assert!(score.value() >= 10);
        prop_assert!(score.value() <= 100);
        prop_assert!(score.value() >= calculate_minimum_score(&scores));
        if score.value() == 10 {
            prop_assert!(catastrophic >= 2);
        }
    }

    /// Property: loudness is averaged as energy, never as dB
    #[test]
    fn loudness_combines_in_energy_domain(
        a in -60.0f64..0.0,
        b in -60.0f64..0.0,
        da in 0.5f64..30.0,
        db in 0.5f64..30.0,
    ) {
        let mut acc = LoudnessAccumulator::new();
        acc.add(Some(a), da, LoudnessMethod::EbuR128);
        acc.add(Some(b), db, LoudnessMethod::EbuR128);
        let lufs = acc.finish().lufs.unwrap();

        let expected = 10.0
            * ((da * 10f64.powf(a / 10.0) + db * 10f64.powf(b / 10.0)) / (da + db)).log10();
        prop_assert!((lufs - expected).abs() < 1e-9);
        prop_assert!(lufs >= a.min(b) - 1e-9 && lufs <= a.max(b) + 1e-9);
        // Energy mean is never below the dB mean
        prop_assert!(lufs >= (a * da + b * db) / (da + db) - 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: peaks, balance and energy sums do not depend on chunking
    #[test]
    fn chunking_preserves_sums(
        left_amp in 0.05f64..0.9,
        right_amp in 0.05f64..0.9,
        seed in 0u64..1_000,
        chunk_seconds in prop::sample::select(vec![0.5f64, 1.0, 2.5]),
    ) {
        let rate = 8_000;
        let frames = 6 * rate as usize;
        let buffer = AudioBuffer::new(
            vec![noise(seed, frames, left_amp), noise(seed + 1, frames, right_amp)],
            rate,
        )
        .unwrap();
        let meter = LoudnessMeter::new(MeterBackend::RmsFallback);
        let peaks = TruePeakScanner::new(4).scan(buffer.channels());
        let mut whole = ChunkAggregator::new();
        whole.push(ChunkPartial::measure(&buffer, &meter, &peaks)).unwrap();
        let whole = whole.reduce().unwrap().metrics;

        let mut scanner = TruePeakScanner::new(4);
        let mut chunked = ChunkAggregator::new();
        for chunk in buffer.chunks(chunk_seconds) {
            let peaks = scanner.scan(chunk.channels());
            chunked.push(ChunkPartial::measure(&chunk, &meter, &peaks)).unwrap();
        }
        let chunked = chunked.reduce().unwrap().metrics;

        prop_assert_eq!(whole.peak_dbfs, chunked.peak_dbfs);
        prop_assert_eq!(whole.true_peak_dbtp, chunked.true_peak_dbtp);
        prop_assert_eq!(whole.clipped_samples, chunked.clipped_samples);
        prop_assert!((whole.lr_balance_db - chunked.lr_balance_db).abs() < 1e-6);
        prop_assert!((whole.crest_factor_db - chunked.crest_factor_db).abs() < 1e-6);
        prop_assert!((whole.ms_ratio - chunked.ms_ratio).abs() < 1e-6);
        prop_assert!((whole.dc_offset.max_offset - chunked.dc_offset.max_offset).abs() < 1e-9);
        prop_assert!((whole.lufs.unwrap() - chunked.lufs.unwrap()).abs() < 0.1);
    }
}
