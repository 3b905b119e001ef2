//! Raw PCM → float buffer for immediate playback.

use super::{base64_to_bytes, pcm_i16_to_f32, AudioError, CHANNELS, SAMPLE_RATE};

/// Decoded audio ready for a playback device.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples in -1.0 ..= 1.0 (mono, so one per frame).
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    /// Mono buffer from i16 samples.
    pub fn from_i16(samples: &[i16], sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: CHANNELS,
            samples: pcm_i16_to_f32(samples),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / f64::from(self.sample_rate) * 1000.0
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Reinterpret s16le bytes as samples scaled by 1/32768, at 24 kHz mono.
pub fn decode_pcm(bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::UnexpectedLength(bytes.len()));
    }
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(AudioBuffer::from_i16(&samples, SAMPLE_RATE))
}

/// Decode a base64 PCM payload straight into a playable buffer.
pub fn decode_base64(encoded: &str) -> Result<AudioBuffer, AudioError> {
    decode_pcm(&base64_to_bytes(encoded)?)
}
