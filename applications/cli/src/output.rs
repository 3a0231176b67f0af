/// Report rendering for the terminal
use crate::error::Result;
use premaster_core::{AnalysisReport, Territory};
use std::fmt::{self, Write};

/// Serialize the full report as pretty-printed JSON
pub fn render_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Short plain-text summary of a report
pub fn render_text(report: &AnalysisReport, show_regions: bool) -> String {
    let mut out = String::new();
    // Formatting into a String is infallible
    let _ = write_summary(&mut out, report, show_regions);
    out
}

fn write_summary(
    out: &mut impl Write,
    report: &AnalysisReport,
    show_regions: bool,
) -> fmt::Result {
    let m = &report.metrics;

    writeln!(out, "{}", report.source.display_name())?;
    writeln!(
        out,
        "  Score: {} ({} mode, floor {})",
        report.final_score,
        report.mode.as_str(),
        report.final_score.floor()
    )?;
    if report.hard_fail {
        writeln!(out, "  HARD FAIL: true peak is beyond recovery")?;
    }
    writeln!(
        out,
        "  Territory: {}",
        match report.territory {
            Territory::Mix => "mix",
            Territory::HotMix => "hot mix",
            Territory::MasterTerritory => "master territory",
        }
    )?;
    if report.mastered.is_mastered {
        writeln!(
            out,
            "  Looks already mastered ({:?} confidence)",
            report.mastered.confidence
        )?;
    }

    writeln!(out)?;
    writeln!(out, "  Peak:         {:>7.2} dBFS", m.peak_dbfs)?;
    writeln!(out, "  True peak:    {:>7.2} dBTP", m.true_peak_dbtp)?;
    match m.lufs {
        Some(lufs) => {
            writeln!(
                out,
                "  Loudness:     {:>7.2} LUFS{}{}",
                lufs,
                if m.lufs_method.is_approximate() { " (approx.)" } else { "" },
                if m.lufs_reliable { "" } else { " (unreliable)" }
            )?;
        }
        None => {
            writeln!(out, "  Loudness:         n/a")?;
        }
    }
    if let Some(plr) = m.plr {
        writeln!(out, "  PLR:          {:>7.2} dB", plr)?;
    }
    writeln!(out, "  Crest factor: {:>7.2} dB", m.crest_factor_db)?;
    if m.channels > 1 {
        writeln!(out, "  Correlation:  {:>7.3}", m.correlation)?;
        writeln!(out, "  Side/mid:     {:>7.3}", m.ms_ratio)?;
        writeln!(out, "  L/R balance:  {:>7.2} dB", m.lr_balance_db)?;
    }

    writeln!(out)?;
    for score in &report.scores {
        writeln!(
            out,
            "  {:<20} {:<13} {:+.1}",
            score.name.as_str(),
            score.status.as_str(),
            score.score_delta
        )?;
    }

    if !report.problem_bands.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Problem bands:")?;
        for band in &report.problem_bands {
            writeln!(
                out,
                "    {:<10} {:>6.3}  {:?}",
                band.band.as_str(),
                band.correlation,
                band.cause
            )?;
        }
    }

    if show_regions && !report.temporal.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Regions:")?;
        for regions in report.temporal.regions.values() {
            for region in regions {
                writeln!(
                    out,
                    "    {:>7.1}s - {:>7.1}s  {:?} ({:?}, avg {:.2})",
                    region.start_s, region.end_s, region.issue, region.severity, region.avg_value
                )?;
            }
        }
    }

    Ok(())
}
