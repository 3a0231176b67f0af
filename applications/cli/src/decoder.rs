/// Audio file decoding using Symphonia
use crate::error::{CliError, Result};
use premaster_core::{AudioBuffer, SourceInfo};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// File extensions the decoder is built to handle
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["wav", "flac", "aiff", "aif", "mp3", "ogg", "m4a"];

/// Whether a path has an extension we can probably decode
pub fn supports_format(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode a whole file into channel-major f64 samples
///
/// Every channel is kept; nothing is downmixed or clamped, so float sources
/// keep any overs they contain.
pub fn decode_file(path: &Path) -> Result<(AudioBuffer, SourceInfo)> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| CliError::decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| CliError::Unsupported("no default track".to_string()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| CliError::Unsupported("unknown sample rate".to_string()))?;
    let bit_depth = track
        .codec_params
        .bits_per_sample
        .and_then(|bits| u16::try_from(bits).ok());
    let codec = symphonia::default::get_codecs()
        .get_codec(track.codec_params.codec)
        .map(|descriptor| descriptor.short_name.to_string());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CliError::decode(format!("Failed to create decoder: {}", e)))?;

    let mut channels: Vec<Vec<f64>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(CliError::decode(format!("Error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_planar(decoded, &mut channels),
            // A corrupt packet is skipped; the rest of the file is still usable
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(CliError::decode(format!("Decode error: {}", e))),
        }
    }

    if channels.is_empty() {
        return Err(CliError::decode("file contains no audio frames"));
    }

    let buffer = AudioBuffer::new(channels, sample_rate)?;
    debug!(
        "Decoded {} frames x {} channels at {} Hz",
        buffer.frames(),
        buffer.num_channels(),
        sample_rate
    );

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut source = SourceInfo::named(file_name).with_format(sample_rate, bit_depth);
    source.codec = codec;

    Ok((buffer, source))
}

/// Append one decoded packet to the per-channel sample vectors
fn append_planar(decoded: AudioBufferRef<'_>, out: &mut Vec<Vec<f64>>) {
    match decoded {
        AudioBufferRef::F32(buf) => extend_channels(&buf, out, f64::from),
        AudioBufferRef::F64(buf) => extend_channels(&buf, out, |s| s),
        // Signed integers use symmetric scaling: divide by 2^(bits-1)
        AudioBufferRef::S32(buf) => extend_channels(&buf, out, |s| f64::from(s) / 2147483648.0),
        AudioBufferRef::S24(buf) => {
            extend_channels(&buf, out, |s| f64::from(s.inner()) / 8388608.0)
        }
        AudioBufferRef::S16(buf) => extend_channels(&buf, out, |s| f64::from(s) / 32768.0),
        AudioBufferRef::S8(buf) => extend_channels(&buf, out, |s| f64::from(s) / 128.0),
        // Unsigned integers are offset-binary around the midpoint
        AudioBufferRef::U32(buf) => {
            extend_channels(&buf, out, |s| (f64::from(s) - 2147483648.0) / 2147483648.0)
        }
        AudioBufferRef::U24(buf) => {
            extend_channels(&buf, out, |s| (f64::from(s.inner()) - 8388608.0) / 8388608.0)
        }
        AudioBufferRef::U16(buf) => {
            extend_channels(&buf, out, |s| (f64::from(s) - 32768.0) / 32768.0)
        }
        AudioBufferRef::U8(buf) => extend_channels(&buf, out, |s| (f64::from(s) - 128.0) / 128.0),
    }
}

fn extend_channels<T, F>(
    buf: &symphonia::core::audio::AudioBuffer<T>,
    out: &mut Vec<Vec<f64>>,
    normalize: F,
) where
    T: Sample + Copy,
    F: Fn(T) -> f64,
{
    let channels = buf.spec().channels.count();
    if out.len() < channels {
        // Channel count is fixed per track; only the first packet grows this
        let frames = out.first().map_or(0, Vec::len);
        out.resize_with(channels, || vec![0.0; frames]);
    }

    for (ch, samples) in out.iter_mut().enumerate().take(channels) {
        samples.extend(buf.chan(ch).iter().map(|&s| normalize(s)));
    }
}
