/// CLI error types
use premaster_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported audio: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid audio buffer: {0}")]
    Core(#[from] CoreError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
