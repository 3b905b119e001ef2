//! Audio utilities for synthesized speech.
//!
//! The speech model returns raw PCM: 16-bit signed little-endian, mono,
//! 24 kHz. [`wav`] wraps it in a WAVE container for export, [`pcm`] decodes
//! it into float samples for playback, and [`output`] owns the playback
//! device for one displayed result.

pub mod output;
pub mod pcm;
pub mod wav;

pub use output::{AudioOutput, PlaybackDevice, PlaybackState};
pub use pcm::{decode_base64, decode_pcm, AudioBuffer};
pub use wav::{encode_wav, wav_from_base64};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Sample rate of synthesized speech.
pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("malformed base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PCM payload of {0} bytes is not a whole number of 16-bit samples")]
    UnexpectedLength(usize),

    #[error("PCM payload of {0} bytes does not fit a WAVE container")]
    TooLarge(usize),

    #[error("invalid WAVE file: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported WAVE format: {0}")]
    Unsupported(String),

    #[error("audio file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio device error: {0}")]
    Device(String),
}

/// Decode a base64 payload into raw bytes.
pub fn base64_to_bytes(encoded: &str) -> Result<Vec<u8>, AudioError> {
    Ok(STANDARD.decode(encoded.trim())?)
}

/// Encode raw bytes as standard base64.
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Convert i16 PCM samples to f32 (range -1.0 .. 1.0).
pub fn pcm_i16_to_f32(input: &[i16]) -> Vec<f32> {
    input.iter().map(|&s| s as f32 / 32768.0).collect()
}
