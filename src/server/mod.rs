//! HTTP JSON API over the orchestrator.
//!
//! Routes:
//! - `GET  /health`
//! - `GET  /api/options`   form choices
//! - `POST /api/generate`  GenerationRequest → GeneratedContent
//! - `POST /api/refine`    {currentMessage, instruction, originalRequest} → GeneratedContent
//! - `POST /api/speech`    {text, voice} → {audioBase64}
//! - `POST /api/audio`     {audioBase64} → WAV attachment
//!
//! The server keeps no per-user state; displayed content lives in the client.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::audio::{self, AudioError};
use crate::error::BridgeError;
use crate::gemini::GenerativeBackend;
use crate::orchestrator::Orchestrator;
use crate::share::AUDIO_FILE_NAME;
use crate::types::{
    GeneratedContent, GenerationRequest, LanguageOption, RecipientType, RequestError, ToneType,
    VoiceOption,
};

type AppState<B> = Arc<Orchestrator<B>>;

/// JSON error body `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError(BridgeError);

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        Self(e)
    }
}

impl From<AudioError> for ApiError {
    fn from(e: AudioError) -> Self {
        Self(BridgeError::Audio(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BridgeError::Request(_) | BridgeError::Audio(_) | BridgeError::NoContent => {
                StatusCode::BAD_REQUEST
            }
            BridgeError::Generation | BridgeError::Refinement | BridgeError::Synthesis => {
                StatusCode::BAD_GATEWAY
            }
            BridgeError::Playback(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Busy => StatusCode::TOO_MANY_REQUESTS,
        };

        let body = Json(json!({
            "error": self.0.to_string()
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineBody {
    pub current_message: String,
    pub instruction: String,
    pub original_request: GenerationRequest,
}

#[derive(Debug, Deserialize)]
pub struct SpeechBody {
    pub text: String,
    #[serde(default)]
    pub voice: VoiceOption,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBody {
    pub audio_base64: String,
}

/// Build the application router.
pub fn router<B: GenerativeBackend + 'static>(orchestrator: Arc<Orchestrator<B>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/options", get(options))
        .route("/api/generate", post(generate::<B>))
        .route("/api/refine", post(refine::<B>))
        .route("/api/speech", post(speech::<B>))
        .route("/api/audio", post(wav_download))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(orchestrator)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn options() -> Json<Value> {
    let recipients: Vec<_> = RecipientType::all().iter().map(|r| r.label()).collect();
    let tones: Vec<_> = ToneType::all().iter().map(|t| t.label()).collect();
    let voices: Vec<_> = VoiceOption::all().iter().map(|v| v.label()).collect();
    let languages: Vec<_> = LanguageOption::all().iter().map(|l| l.label()).collect();
    Json(json!({
        "recipients": recipients,
        "tones": tones,
        "voices": voices,
        "languages": languages,
    }))
}

async fn generate<B: GenerativeBackend + 'static>(
    State(orchestrator): State<AppState<B>>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GeneratedContent>, ApiError> {
    let content = orchestrator.generate(request).await?;
    Ok(Json(content))
}

async fn refine<B: GenerativeBackend + 'static>(
    State(orchestrator): State<AppState<B>>,
    Json(body): Json<RefineBody>,
) -> Result<Json<GeneratedContent>, ApiError> {
    if body.instruction.trim().is_empty() {
        return Err(BridgeError::from(RequestError::EmptyInstruction).into());
    }
    let content = orchestrator
        .refine(
            &body.current_message,
            &body.instruction,
            &body.original_request,
        )
        .await?;
    Ok(Json(content))
}

async fn speech<B: GenerativeBackend + 'static>(
    State(orchestrator): State<AppState<B>>,
    Json(body): Json<SpeechBody>,
) -> Result<Json<AudioBody>, ApiError> {
    let audio_base64 = orchestrator.synthesize_speech(&body.text, body.voice).await?;
    Ok(Json(AudioBody { audio_base64 }))
}

async fn wav_download(Json(body): Json<AudioBody>) -> Result<Response, ApiError> {
    let wav = audio::wav_from_base64(&body.audio_base64).inspect_err(|e| {
        warn!(error = %e, "rejected audio payload");
    })?;
    let disposition = format!("attachment; filename=\"{AUDIO_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        wav,
    )
        .into_response())
}
