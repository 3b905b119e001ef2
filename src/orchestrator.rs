//! Request orchestration: prompt → backend call → normalized content.
//!
//! Every backend failure is caught here, logged with its cause, and
//! converted to the matching [`BridgeError`]. No partial state escapes.

use tracing::{debug, error, info, warn};

use crate::error::BridgeError;
use crate::gemini::{GenerativeBackend, SpeechRequest, TextRequest};
use crate::normalize::{self, PLACEHOLDER_MESSAGE};
use crate::prompt;
use crate::types::{GeneratedContent, GenerationRequest, VoiceOption};
use crate::utils::log_preview;

pub struct Orchestrator<B> {
    backend: B,
}

impl<B: GenerativeBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Draft a new message for `request`. The result has no audio.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedContent, BridgeError> {
        request.validate()?;

        let text_request = TextRequest {
            prompt: prompt::generation_prompt(&request),
            system_instruction: Some(prompt::SYSTEM_INSTRUCTION.to_string()),
            grounding: true,
        };

        info!(
            recipient = %request.recipient,
            tone = %request.tone,
            language = %request.language,
            "generating message"
        );

        let response = self
            .backend
            .generate_text(text_request)
            .await
            .map_err(|e| {
                error!(error = %e, "generation failed");
                BridgeError::Generation
            })?;

        let message = normalize::message_or(&response, PLACEHOLDER_MESSAGE);
        let sources = normalize::grounding_sources(&response);

        debug!(
            sources = sources.len(),
            preview = %log_preview(&message, 80),
            "generation complete"
        );

        Ok(GeneratedContent::new(message, sources, request))
    }

    /// Rewrite `current_message` per `instruction`.
    ///
    /// The result references `original` unchanged and carries no audio.
    /// When the backend returns no text the current message is kept.
    pub async fn refine(
        &self,
        current_message: &str,
        instruction: &str,
        original: &GenerationRequest,
    ) -> Result<GeneratedContent, BridgeError> {
        let text_request = TextRequest {
            prompt: prompt::refinement_prompt(current_message, instruction, original),
            system_instruction: None,
            grounding: true,
        };

        info!(
            instruction = %log_preview(instruction, 80),
            "refining message"
        );

        let response = self
            .backend
            .generate_text(text_request)
            .await
            .map_err(|e| {
                error!(error = %e, "refinement failed");
                BridgeError::Refinement
            })?;

        let message = normalize::message_or(&response, current_message);
        let sources = normalize::grounding_sources(&response);

        debug!(sources = sources.len(), "refinement complete");

        Ok(GeneratedContent::new(message, sources, original.clone()))
    }

    /// Synthesize `text` with `voice`; returns the base64 raw PCM payload.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        voice: VoiceOption,
    ) -> Result<String, BridgeError> {
        let speech_request = SpeechRequest {
            text: text.to_string(),
            voice_name: voice.voice_name().to_string(),
        };

        info!(
            voice = voice.voice_name(),
            chars = text.chars().count(),
            "synthesizing speech"
        );

        let response = self
            .backend
            .generate_speech(speech_request)
            .await
            .map_err(|e| {
                error!(error = %e, "speech synthesis failed");
                BridgeError::Synthesis
            })?;

        match normalize::inline_audio(&response) {
            Some(audio) => {
                debug!(encoded_bytes = audio.len(), "speech synthesis complete");
                Ok(audio)
            }
            None => {
                warn!("speech response carried no audio payload");
                Err(BridgeError::Synthesis)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{GenerateContentResponse, MockGenerativeBackend};
    use crate::types::{LanguageOption, RecipientType, ToneType};
    use serde_json::json;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "I need space",
            RecipientType::Parent,
            ToneType::Empathetic,
            VoiceOption::Kore,
            LanguageOption::English,
        )
        .unwrap()
    }

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    fn mock() -> MockGenerativeBackend {
        MockGenerativeBackend::new()
    }

    #[tokio::test]
    async fn generate_dedups_sources_and_leaves_audio_unset() {
        let mut backend = mock();
        backend
            .expect_generate_text()
            .withf(|req| {
                req.grounding
                    && req.prompt.contains("I need space")
                    && req.system_instruction.as_deref() == Some(prompt::SYSTEM_INSTRUCTION)
            })
            .times(1)
            .returning(|_| {
                Ok(response(json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "Dear Mom, I need some space."}]},
                        "groundingMetadata": {"groundingChunks": [
                            {"web": {"title": "APA", "uri": "https://apa.org/boundaries"}},
                            {"web": {"title": "APA again", "uri": "https://apa.org/boundaries"}}
                        ]}
                    }]
                })))
            });

        let orchestrator = Orchestrator::new(backend);
        let content = orchestrator.generate(request()).await.unwrap();
        assert_eq!(content.message, "Dear Mom, I need some space.");
        assert_eq!(content.sources.len(), 1);
        assert_eq!(content.sources[0].title, "APA");
        assert!(content.audio_base64.is_none());
        assert_eq!(content.original_request, request());
    }

    #[tokio::test]
    async fn generate_without_text_uses_placeholder() {
        let mut backend = mock();
        backend
            .expect_generate_text()
            .returning(|_| Ok(GenerateContentResponse::default()));
        let content = Orchestrator::new(backend).generate(request()).await.unwrap();
        assert_eq!(content.message, PLACEHOLDER_MESSAGE);
        assert!(content.sources.is_empty());
    }

    #[tokio::test]
    async fn generate_failure_maps_to_generation_error() {
        let mut backend = mock();
        backend
            .expect_generate_text()
            .returning(|_| Err(anyhow::anyhow!("503 Service Unavailable")));
        let err = Orchestrator::new(backend).generate(request()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Generation));
    }

    #[tokio::test]
    async fn generate_rejects_empty_input_without_calling_backend() {
        let mut backend = mock();
        backend.expect_generate_text().never();
        let mut req = request();
        req.user_input = "  ".into();
        let err = Orchestrator::new(backend).generate(req).await.unwrap_err();
        assert!(matches!(err, BridgeError::Request(_)));
    }

    #[tokio::test]
    async fn refine_keeps_original_request() {
        let mut backend = mock();
        backend
            .expect_generate_text()
            .withf(|req| {
                req.system_instruction.is_none()
                    && req.prompt.contains("make it shorter")
                    && req.prompt.contains("Dear Mom")
            })
            .returning(|_| {
                Ok(response(json!({
                    "candidates": [{"content": {"parts": [{"text": "Mom, I need space."}]}}]
                })))
            });
        let original = request();
        let content = Orchestrator::new(backend)
            .refine("Dear Mom, I need some space.", "make it shorter", &original)
            .await
            .unwrap();
        assert_eq!(content.message, "Mom, I need space.");
        assert_eq!(content.original_request, original);
        assert!(content.audio_base64.is_none());
    }

    #[tokio::test]
    async fn refine_without_text_keeps_current_message() {
        let mut backend = mock();
        backend
            .expect_generate_text()
            .returning(|_| Ok(GenerateContentResponse::default()));
        let content = Orchestrator::new(backend)
            .refine("keep me", "shorter", &request())
            .await
            .unwrap();
        assert_eq!(content.message, "keep me");
    }

    #[tokio::test]
    async fn refine_failure_maps_to_refinement_error() {
        let mut backend = mock();
        backend
            .expect_generate_text()
            .returning(|_| Err(anyhow::anyhow!("boom")));
        let err = Orchestrator::new(backend)
            .refine("x", "y", &request())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Refinement));
    }

    #[tokio::test]
    async fn speech_requests_mapped_voice_name() {
        let mut backend = mock();
        backend
            .expect_generate_speech()
            .withf(|req| req.voice_name == "Kore" && req.text == "hello")
            .times(1)
            .returning(|_| {
                Ok(response(json!({
                    "candidates": [{"content": {"parts": [{"inlineData": {"data": "AACA"}}]}}]
                })))
            });
        let audio = Orchestrator::new(backend)
            .synthesize_speech("hello", VoiceOption::Kore)
            .await
            .unwrap();
        assert_eq!(audio, "AACA");
    }

    #[tokio::test]
    async fn speech_without_payload_is_synthesis_error() {
        let mut backend = mock();
        backend
            .expect_generate_speech()
            .returning(|_| Ok(GenerateContentResponse::default()));
        let err = Orchestrator::new(backend)
            .synthesize_speech("hello", VoiceOption::Fenrir)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Synthesis));
    }

    #[tokio::test]
    async fn speech_backend_error_is_synthesis_error() {
        let mut backend = mock();
        backend
            .expect_generate_speech()
            .returning(|_| Err(anyhow::anyhow!("quota")));
        let err = Orchestrator::new(backend)
            .synthesize_speech("hello", VoiceOption::Puck)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Synthesis));
    }
}
