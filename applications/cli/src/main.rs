/// premaster - mastering-readiness analysis from the command line
use anyhow::Context;
use clap::{Parser, Subcommand};
use premaster_analysis::MixAnalyzer;
use premaster_core::ScoringMode;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod decoder;
mod error;
mod output;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "premaster")]
#[command(about = "Check whether a mix is ready for mastering", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./premaster.toml if present)
    #[arg(short, long, global = true, env = "PREMASTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more audio files
    Analyze {
        /// Audio files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Score against the strict threshold tables
        #[arg(long)]
        strict: bool,

        /// Chunk length in seconds for long files
        #[arg(long)]
        chunk_seconds: Option<f64>,

        /// Always analyze in chunks, whatever the duration
        #[arg(long, conflicts_with = "whole_file")]
        force_chunked: bool,

        /// Always analyze in a single pass, whatever the duration
        #[arg(long)]
        whole_file: bool,

        /// Mark the input as a transcoded proxy of the original file
        #[arg(long)]
        proxy: bool,
    },
    /// Print the effective configuration as JSON
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON on stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "premaster=info,premaster_analysis=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            files,
            json,
            strict,
            chunk_seconds,
            force_chunked,
            whole_file,
            proxy,
        } => {
            if strict {
                config.analysis.mode = ScoringMode::Strict;
            }
            if let Some(seconds) = chunk_seconds {
                config.analysis.chunk_seconds = seconds;
            }
            config.output.json |= json;

            let strategy = if force_chunked {
                Strategy::Chunked
            } else if whole_file {
                Strategy::WholeFile
            } else {
                Strategy::Auto
            };

            let analyzer = MixAnalyzer::new(config.analysis.clone())?;
            let mut failures = 0usize;
            for file in &files {
                if let Err(e) = analyze_file(&analyzer, &config, file, strategy, proxy) {
                    tracing::error!("{}: {:#}", file.display(), e);
                    failures += 1;
                }
            }

            if failures > 0 {
                anyhow::bail!("{} of {} file(s) failed", failures, files.len());
            }
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Strategy {
    Auto,
    WholeFile,
    Chunked,
}

fn analyze_file(
    analyzer: &MixAnalyzer,
    config: &CliConfig,
    path: &Path,
    strategy: Strategy,
    proxy: bool,
) -> anyhow::Result<()> {
    if !decoder::supports_format(path) {
        tracing::warn!(
            "{}: unrecognised extension, trying to decode anyway",
            path.display()
        );
    }

    let (buffer, mut source) = decoder::decode_file(path)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    source.is_proxy = proxy;

    tracing::info!(
        "Decoded {} ({:.1}s, {} Hz, {} ch)",
        source.display_name(),
        buffer.duration_secs(),
        buffer.sample_rate(),
        buffer.num_channels()
    );

    let report = match strategy {
        Strategy::Auto => analyzer.analyze_auto(&buffer, source)?,
        Strategy::WholeFile => analyzer.analyze(&buffer, source)?,
        Strategy::Chunked => analyzer.analyze_chunked(
            buffer.chunks(analyzer.config().chunk_seconds),
            source,
        )?,
    };

    if config.output.json {
        println!("{}", output::render_json(&report)?);
    } else {
        print!("{}", output::render_text(&report, config.output.show_regions));
    }

    Ok(())
}
