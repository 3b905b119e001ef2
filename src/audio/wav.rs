//! WAVE container for synthesized speech.
//!
//! Layout of the 44-byte canonical header (all integers little-endian):
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | `RIFF`                                  |
//! | 4      | 4    | 36 + data length                        |
//! | 8      | 4    | `WAVE`                                  |
//! | 12     | 4    | `fmt `                                  |
//! | 16     | 4    | 16 (fmt chunk length)                   |
//! | 20     | 2    | 1 (PCM)                                 |
//! | 22     | 2    | channels                                |
//! | 24     | 4    | sample rate                             |
//! | 28     | 4    | byte rate = rate × block align          |
//! | 32     | 2    | block align = channels × bytes/sample   |
//! | 34     | 2    | bits per sample                         |
//! | 36     | 4    | `data`                                  |
//! | 40     | 4    | data length                             |

use std::io::Cursor;
use std::path::Path;

use tracing::debug;

use super::{base64_to_bytes, AudioBuffer, AudioError, BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};

pub const HEADER_LEN: usize = 44;
const FORMAT_PCM: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Prefix raw PCM (s16le, mono, 24 kHz) with a WAVE header.
///
/// The payload is copied unmodified after the header.
pub fn encode_wav(pcm: &[u8]) -> Result<Vec<u8>, AudioError> {
    let data_len = u32::try_from(pcm.len())
        .ok()
        .filter(|len| len.checked_add(36).is_some())
        .ok_or(AudioError::TooLarge(pcm.len()))?;

    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = SAMPLE_RATE * u32::from(block_align);

    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);

    debug!(data_len, total = out.len(), "encoded WAVE container");
    Ok(out)
}

/// Decode a base64 PCM payload and wrap it in a WAVE container.
pub fn wav_from_base64(encoded: &str) -> Result<Vec<u8>, AudioError> {
    encode_wav(&base64_to_bytes(encoded)?)
}

/// Parse WAV bytes (16-bit integer PCM, mono) into a playable buffer.
pub fn read_wav(wav_bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(wav_bytes))?;
    let spec = reader.spec();
    if spec.channels != CHANNELS
        || spec.bits_per_sample != BITS_PER_SAMPLE
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(AudioError::Unsupported(format!(
            "{} channel(s), {}-bit {:?}",
            spec.channels, spec.bits_per_sample, spec.sample_format
        )));
    }
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AudioBuffer::from_i16(&samples, spec.sample_rate))
}

/// Read and parse a WAV file from disk.
pub fn read_wav_file(path: &Path) -> Result<AudioBuffer, AudioError> {
    read_wav(&std::fs::read(path)?)
}
