/// Audio input types
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Lowest sample rate accepted by [`AudioBuffer::new`]
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest sample rate accepted by [`AudioBuffer::new`]
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// Decoded audio handed to the analysis engine
///
/// Samples are stored channel-major as f64 in the nominal range [-1.0, 1.0]:
/// `channels[c][n]` is frame `n` of channel `c`. A mono file is a single
/// channel. The buffer is immutable once built; every analysis stage only
/// borrows it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f64>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// Returns an error if there are no channels, if the channels differ in
    /// length, or if the sample rate is outside 8 kHz–768 kHz.
    pub fn new(channels: Vec<Vec<f64>>, sample_rate: u32) -> Result<Self> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(CoreError::InvalidSampleRate(sample_rate));
        }
        let Some(first) = channels.first() else {
            return Err(CoreError::NoChannels);
        };

        let expected = first.len();
        if let Some((channel, found)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
            .map(|(i, ch)| (i, ch.len()))
        {
            return Err(CoreError::ChannelLengthMismatch {
                channel,
                expected,
                found,
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved samples (L R L R ... for stereo)
    ///
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_interleaved(samples: &[f64], num_channels: usize, sample_rate: u32) -> Result<Self> {
        if num_channels == 0 {
            return Err(CoreError::NoChannels);
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, &sample) in channels.iter_mut().zip(frame) {
                ch.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// All channels, channel-major
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds, derived from frames and sample rate
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Check if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Check if the buffer has exactly one channel
    pub fn is_mono(&self) -> bool {
        self.channels.len() == 1
    }

    /// Left and right channels, if the buffer has at least two
    pub fn stereo_pair(&self) -> Option<(&[f64], &[f64])> {
        match self.channels.as_slice() {
            [left, right, ..] => Some((left, right)),
            _ => None,
        }
    }

    /// Copy frames `[start, end)` into a new buffer
    ///
    /// The range is clamped to the buffer length.
    pub fn slice_frames(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.frames());
        let start = start.min(end);
        Self {
            channels: self
                .channels
                .iter()
                .map(|ch| ch[start..end].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Split into consecutive owned chunks of `seconds` each, in file order
    ///
    /// The last chunk holds whatever remains and may be shorter. A
    /// non-positive length yields the whole buffer as a single chunk.
    pub fn chunks(&self, seconds: f64) -> impl Iterator<Item = AudioBuffer> + '_ {
        let frames = self.frames();
        let chunk_frames = if seconds > 0.0 {
            ((seconds * f64::from(self.sample_rate)).round() as usize).max(1)
        } else {
            frames.max(1)
        };
        (0..frames)
            .step_by(chunk_frames)
            .map(move |start| self.slice_frames(start, start + chunk_frames))
    }
}

/// Provenance of the analysed file
///
/// Describes the *original* file, which may differ from the buffer actually
/// measured (for example when a compressed proxy was decoded). The engine
/// copies this into the report untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// File name as given by the caller
    pub file_name: Option<String>,

    /// Sample rate of the original file in Hz
    pub sample_rate: Option<u32>,

    /// Bit depth of the original file, when the format has one
    pub bit_depth: Option<u16>,

    /// Codec or container label (e.g. "flac", "wav")
    pub codec: Option<String>,

    /// Whether the measured buffer is a transcoded proxy of the original
    pub is_proxy: bool,
}

impl SourceInfo {
    /// Create provenance for a named file
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    /// File name for log lines and summaries
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("<buffer>")
    }

    /// Set the original sample rate and bit depth
    #[must_use]
    pub fn with_format(mut self, sample_rate: u32, bit_depth: Option<u16>) -> Self {
        self.sample_rate = Some(sample_rate);
        self.bit_depth = bit_depth;
        self
    }
}
