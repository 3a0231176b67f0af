/// CLI configuration management
use crate::error::{CliError, Result};
use premaster_analysis::AnalysisConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "premaster.toml";

/// Everything the CLI reads from files and the environment
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Emit the full report as JSON instead of a text summary
    #[serde(default)]
    pub json: bool,

    /// Include per-window temporal regions in the text summary
    #[serde(default = "default_show_regions")]
    pub show_regions: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            show_regions: default_show_regions(),
        }
    }
}

impl CliConfig {
    /// Load configuration
    ///
    /// Sources, lowest priority first: built-in defaults, the TOML file at
    /// `path` (or `premaster.toml` if it exists), then `PREMASTER_*`
    /// environment variables such as `PREMASTER_ANALYSIS__MODE=strict`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Nested keys use a double underscore so field names keep theirs
        settings = settings.add_source(
            config::Environment::with_prefix("PREMASTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: CliConfig = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(config)
    }
}

// Default values
fn default_show_regions() -> bool {
    true
}
