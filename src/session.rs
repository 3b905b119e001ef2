//! Interactive session state: the compose form and the displayed result.
//!
//! A [`Session`] is in one of two views. `Compose` holds an optional draft
//! to prefill the form; `Result` holds the displayed content together with
//! the audio output that belongs to it. Replacing or dismissing the result
//! drops its audio output, which releases the device.
//!
//! Failures are kept as a dismissable message and never replace content
//! that is still valid.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio::{self, AudioOutput, PlaybackState};
use crate::concurrency::{InFlightGate, Task};
use crate::error::BridgeError;
use crate::gemini::GenerativeBackend;
use crate::orchestrator::Orchestrator;
use crate::share::{self, ShareError};
use crate::types::{GeneratedContent, GenerationRequest};

/// Builds the audio output for each newly displayed result.
pub type OutputFactory = Box<dyn Fn() -> AudioOutput>;

pub struct ResultView {
    content: GeneratedContent,
    output: AudioOutput,
}

impl ResultView {
    pub fn content(&self) -> &GeneratedContent {
        &self.content
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.output.state()
    }
}

pub enum View {
    Compose { draft: Option<GenerationRequest> },
    Result(ResultView),
}

/// Result of toggling playback.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenOutcome {
    Started { duration_ms: f64 },
    Stopped,
}

pub struct Session<B> {
    orchestrator: Arc<Orchestrator<B>>,
    view: View,
    error: Option<String>,
    gate: InFlightGate,
    output_factory: OutputFactory,
}

impl<B: GenerativeBackend> Session<B> {
    pub fn new(orchestrator: Arc<Orchestrator<B>>, output_factory: OutputFactory) -> Self {
        Self {
            orchestrator,
            view: View::Compose { draft: None },
            error: None,
            gate: InFlightGate::new(),
            output_factory,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn content(&self) -> Option<&GeneratedContent> {
        match &self.view {
            View::Result(result) => Some(&result.content),
            View::Compose { .. } => None,
        }
    }

    /// Request to prefill the compose form with.
    pub fn draft(&self) -> Option<&GenerationRequest> {
        match &self.view {
            View::Compose { draft } => draft.as_ref(),
            View::Result(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Loading flag shared with observers such as a spinner.
    pub fn gate(&self) -> InFlightGate {
        self.gate.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    fn record<T>(&mut self, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }

    /// Generate a message and switch to the result view.
    ///
    /// On failure the view stays on compose with `request` as the draft.
    pub async fn submit(&mut self, request: GenerationRequest) -> Result<(), BridgeError> {
        let validated = request.validate().map_err(BridgeError::from);
        self.record(validated)?;
        let Some(_call) = self.gate.begin(Task::Drafting) else {
            return Err(BridgeError::Busy);
        };
        self.error = None;

        let result = self.orchestrator.generate(request.clone()).await;
        match result {
            Ok(content) => {
                self.view = View::Result(ResultView {
                    content,
                    output: (self.output_factory)(),
                });
                Ok(())
            }
            Err(e) => {
                self.view = View::Compose {
                    draft: Some(request),
                };
                self.record(Err(e))
            }
        }
    }

    /// Rewrite the displayed message. Blank instructions are ignored and
    /// return `Ok(false)`.
    ///
    /// Success replaces the content and clears its cached audio; failure
    /// leaves the displayed content untouched.
    pub async fn refine(&mut self, instruction: &str) -> Result<bool, BridgeError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Ok(false);
        }
        let View::Result(result) = &self.view else {
            return self.record(Err(BridgeError::NoContent));
        };
        let Some(_call) = self.gate.begin(Task::Refining) else {
            return Err(BridgeError::Busy);
        };

        let outcome = self
            .orchestrator
            .refine(
                &result.content.message,
                instruction,
                &result.content.original_request,
            )
            .await;

        match outcome {
            Ok(mut refined) => {
                refined.clear_audio();
                if let View::Result(result) = &mut self.view {
                    result.output.stop();
                    result.content = refined;
                }
                self.error = None;
                Ok(true)
            }
            Err(e) => self.record(Err(e)),
        }
    }

    /// Toggle playback of the displayed message.
    ///
    /// Stops if playing. Otherwise synthesizes speech on first use, caches it
    /// on the content, decodes it, and starts playing.
    pub async fn listen(&mut self) -> Result<ListenOutcome, BridgeError> {
        let View::Result(result) = &mut self.view else {
            return self.record(Err(BridgeError::NoContent));
        };

        if result.output.poll() == PlaybackState::Playing {
            result.output.stop();
            return Ok(ListenOutcome::Stopped);
        }

        let Some(_call) = self.gate.begin(Task::Synthesizing) else {
            return Err(BridgeError::Busy);
        };
        result.output.begin_loading();

        let encoded = match result.content.audio_base64.clone() {
            Some(cached) => {
                debug!("using cached audio");
                cached
            }
            None => {
                let synthesized = self
                    .orchestrator
                    .synthesize_speech(
                        &result.content.message,
                        result.content.original_request.voice,
                    )
                    .await;
                match synthesized {
                    Ok(audio) => {
                        result.content.audio_base64 = Some(audio.clone());
                        audio
                    }
                    Err(e) => {
                        result.output.fail();
                        return self.record(Err(e));
                    }
                }
            }
        };

        let buffer = match audio::decode_base64(&encoded) {
            Ok(buffer) => buffer,
            Err(e) => {
                result.output.fail();
                return self.record(Err(e.into()));
            }
        };
        let duration_ms = buffer.duration_ms();

        if let Err(e) = result.output.play(buffer) {
            warn!(error = %e, "playback failed");
            return self.record(Err(BridgeError::Playback(e)));
        }
        Ok(ListenOutcome::Started { duration_ms })
    }

    /// Stop playback if anything is playing.
    pub fn stop(&mut self) {
        if let View::Result(result) = &mut self.view {
            result.output.stop();
        }
    }

    /// Refresh the playback state (natural completion → idle).
    pub fn poll_playback(&mut self) -> Option<PlaybackState> {
        match &mut self.view {
            View::Result(result) => Some(result.output.poll()),
            View::Compose { .. } => None,
        }
    }

    /// Export the synthesized audio as a WAV file into `dir`.
    pub fn export(&mut self, dir: &Path) -> Result<PathBuf, ShareError> {
        let View::Result(result) = &self.view else {
            return Err(ShareError::NoAudio);
        };
        let exported = share::export_audio(&result.content, dir);
        if let Err(e) = &exported {
            self.error = Some(e.to_string());
        }
        exported
    }

    /// Back to the form, prefilled with the displayed result's request.
    pub fn edit(&mut self) {
        if let View::Result(result) = &self.view {
            let draft = result.content.original_request.clone();
            self.view = View::Compose { draft: Some(draft) };
        }
    }

    /// Discard everything and start over.
    pub fn reset(&mut self) {
        self.view = View::Compose { draft: None };
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::testing::{broken_output, recording_output};
    use crate::gemini::{GenerateContentResponse, MockGenerativeBackend};
    use crate::types::{LanguageOption, RecipientType, ToneType, VoiceOption};
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

    fn text_response(text: &str) -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }))
        .unwrap()
    }

    fn audio_response() -> GenerateContentResponse {
        // two samples: 0 and -32768
        serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"data": "AAAAgA=="}}]}}]
        }))
        .unwrap()
    }

    fn session(backend: MockGenerativeBackend) -> Session<MockGenerativeBackend> {
        Session::new(
            Arc::new(Orchestrator::new(backend)),
            Box::new(|| recording_output().0),
        )
    }

    async fn displayed(mut backend: MockGenerativeBackend) -> Session<MockGenerativeBackend> {
        backend
            .expect_generate_text()
            .times(1)
            .returning(|_| Ok(text_response("Dear Mom, I need some space.")));
        let mut s = session(backend);
        s.submit(request()).await.unwrap();
        s
    }

    #[tokio::test]
    async fn submit_switches_to_result_without_audio() {
        let s = displayed(MockGenerativeBackend::new()).await;
        let content = s.content().unwrap();
        assert_eq!(content.message, "Dear Mom, I need some space.");
        assert!(content.audio_base64.is_none());
        assert!(s.error().is_none());
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn failed_submit_keeps_draft_and_reports() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_text()
            .returning(|_| Err(anyhow::anyhow!("down")));
        let mut s = session(backend);
        assert!(s.submit(request()).await.is_err());
        assert_eq!(
            s.error(),
            Some("Failed to process your request. Please try again.")
        );
        assert_eq!(s.draft(), Some(&request()));
        s.dismiss_error();
        assert!(s.error().is_none());
    }

    #[tokio::test]
    async fn refine_replaces_message_and_clears_audio() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_speech()
            .times(1)
            .returning(|_| Ok(audio_response()));
        backend
            .expect_generate_text()
            .times(2)
            .returning(|req| {
                if req.prompt.contains("refining") {
                    Ok(text_response("Mom, I need space."))
                } else {
                    Ok(text_response("Dear Mom, I need some space."))
                }
            });
        let mut s = session(backend);
        s.submit(request()).await.unwrap();
        s.listen().await.unwrap();
        assert!(s.content().unwrap().has_audio());

        assert!(s.refine("make it shorter").await.unwrap());
        let content = s.content().unwrap();
        assert_eq!(content.message, "Mom, I need space.");
        assert_eq!(content.original_request, request());
        assert!(content.audio_base64.is_none());
        match s.view() {
            View::Result(result) => assert_eq!(result.playback_state(), PlaybackState::Idle),
            View::Compose { .. } => panic!("expected result view"),
        }
    }

    #[tokio::test]
    async fn failed_refine_keeps_previous_content() {
        let mut backend = MockGenerativeBackend::new();
        let mut calls = 0;
        backend.expect_generate_text().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(text_response("original"))
            } else {
                Err(anyhow::anyhow!("refine failed upstream"))
            }
        });
        let mut s = session(backend);
        s.submit(request()).await.unwrap();
        assert!(s.refine("warmer").await.is_err());
        assert_eq!(s.content().unwrap().message, "original");
        assert_eq!(s.error(), Some("Failed to refine message."));
    }

    #[tokio::test]
    async fn blank_refinement_is_ignored() {
        let mut s = displayed(MockGenerativeBackend::new()).await;
        assert!(!s.refine("   ").await.unwrap());
    }

    #[tokio::test]
    async fn listen_synthesizes_once_and_toggles() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_speech()
            .withf(|req| req.voice_name == "Kore")
            .times(1)
            .returning(|_| Ok(audio_response()));
        let mut s = displayed(backend).await;

        let outcome = s.listen().await.unwrap();
        assert!(matches!(outcome, ListenOutcome::Started { .. }));
        assert_eq!(s.content().unwrap().audio_base64.as_deref(), Some("AAAAgA=="));

        assert_eq!(s.listen().await.unwrap(), ListenOutcome::Stopped);
        // cached audio, no second synthesis call
        assert!(matches!(
            s.listen().await.unwrap(),
            ListenOutcome::Started { .. }
        ));
    }

    #[tokio::test]
    async fn synthesis_failure_returns_to_idle() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_speech()
            .returning(|_| Ok(GenerateContentResponse::default()));
        let mut s = displayed(backend).await;
        assert!(matches!(s.listen().await, Err(BridgeError::Synthesis)));
        assert_eq!(s.poll_playback(), Some(PlaybackState::Idle));
        assert_eq!(s.error(), Some("Failed to generate audio."));
        assert!(!s.content().unwrap().has_audio());
    }

    #[tokio::test]
    async fn playback_device_failure_keeps_audio() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_text()
            .returning(|_| Ok(text_response("hello")));
        backend
            .expect_generate_speech()
            .returning(|_| Ok(audio_response()));
        let mut s = Session::new(
            Arc::new(Orchestrator::new(backend)),
            Box::new(broken_output),
        );
        s.submit(request()).await.unwrap();
        let err = s.listen().await.unwrap_err();
        assert!(matches!(err, BridgeError::Playback(_)));
        assert_eq!(s.error(), Some("Failed to play audio."));
        assert_eq!(s.error(), Some(err.to_string().as_str()));
        assert!(s.content().unwrap().has_audio());
    }

    #[tokio::test]
    async fn export_after_listen() {
        let mut backend = MockGenerativeBackend::new();
        backend
            .expect_generate_speech()
            .returning(|_| Ok(audio_response()));
        let mut s = displayed(backend).await;
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(s.export(dir.path()), Err(ShareError::NoAudio)));
        s.listen().await.unwrap();
        let path = s.export(dir.path()).unwrap();
        assert!(path.ends_with(share::AUDIO_FILE_NAME));
    }

    #[tokio::test]
    async fn edit_prefills_draft_and_reset_clears_it() {
        let mut s = displayed(MockGenerativeBackend::new()).await;
        s.edit();
        assert!(s.content().is_none());
        assert_eq!(s.draft(), Some(&request()));
        s.reset();
        assert!(s.draft().is_none());
    }

    #[tokio::test]
    async fn busy_gate_rejects_submission() {
        let mut s = session(MockGenerativeBackend::new());
        let gate = s.gate();
        let _call = gate.begin(Task::Drafting).unwrap();
        assert!(s.is_busy());
        assert!(matches!(s.submit(request()).await, Err(BridgeError::Busy)));
    }

    #[tokio::test]
    async fn gate_names_the_running_call() {
        let observed = Arc::new(std::sync::OnceLock::<InFlightGate>::new());
        let seen = Arc::clone(&observed);
        let mut backend = MockGenerativeBackend::new();
        backend.expect_generate_text().returning(move |_| {
            assert_eq!(seen.get().and_then(|g| g.current()), Some(Task::Drafting));
            Ok(text_response("Dear Mom"))
        });
        let mut s = session(backend);
        let _ = observed.set(s.gate());

        s.submit(request()).await.unwrap();
        assert_eq!(s.gate().current(), None);
    }

    #[tokio::test]
    async fn listen_requires_result() {
        let mut s = session(MockGenerativeBackend::new());
        assert!(matches!(s.listen().await, Err(BridgeError::NoContent)));
    }
}
