use thiserror::Error;

use crate::audio::AudioError;
use crate::types::RequestError;

/// User-facing failures. The display text is what the user sees; the
/// underlying cause is logged where the failure is caught.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to process your request. Please try again.")]
    Generation,

    #[error("Failed to refine message.")]
    Refinement,

    #[error("Failed to generate audio.")]
    Synthesis,

    #[error("Could not process audio.")]
    Audio(#[from] AudioError),

    #[error("Failed to play audio.")]
    Playback(#[source] AudioError),

    #[error("{0}")]
    Request(#[from] RequestError),

    #[error("Please wait for the current request to finish.")]
    Busy,

    #[error("Generate a message first.")]
    NoContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages() {
        assert_eq!(
            BridgeError::Generation.to_string(),
            "Failed to process your request. Please try again."
        );
        assert_eq!(BridgeError::Refinement.to_string(), "Failed to refine message.");
        assert_eq!(BridgeError::Synthesis.to_string(), "Failed to generate audio.");
        assert_eq!(
            BridgeError::Playback(AudioError::Device("no device".into())).to_string(),
            "Failed to play audio."
        );
    }

    #[test]
    fn request_errors_pass_through() {
        let err: BridgeError = RequestError::EmptyInput.into();
        assert_eq!(err.to_string(), RequestError::EmptyInput.to_string());
    }
}
