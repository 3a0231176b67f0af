/// Core error types for premaster
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building core values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A buffer was built without any channels
    #[error("Audio buffer has no channels")]
    NoChannels,

    /// A buffer holds no frames where samples are required
    #[error("Audio buffer contains no samples")]
    EmptyBuffer,

    /// Channels of a buffer disagree on length
    #[error("Channel {channel} has {found} samples, expected {expected}")]
    ChannelLengthMismatch {
        /// Index of the offending channel
        channel: usize,
        /// Length of channel 0
        expected: usize,
        /// Length of the offending channel
        found: usize,
    },

    /// Sample rate outside the supported range
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 768000)")]
    InvalidSampleRate(u32),
}
