//! REST client for the hosted `generateContent` endpoint.
//!
//! Flow:
//! 1. Build a [`GenerateContentRequest`] from a text or speech request
//! 2. POST `{base_url}/models/{model}:generateContent` with the API key header
//! 3. Decode the JSON envelope into [`GenerateContentResponse`]
//!
//! No timeout is configured: a call runs until it completes or fails.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{
    GenerateContentRequest, GenerateContentResponse, GenerativeBackend, SpeechRequest,
    TextRequest,
};
use crate::config::GeminiConfig;
use crate::utils::safe_truncate;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Max bytes of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 512;

pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model);
        debug!(%url, "generateContent request");

        let resp = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .context("generateContent request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "generateContent returned {}: {}",
                status,
                safe_truncate(&text, ERROR_BODY_LIMIT)
            );
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .context("failed to parse generateContent response as JSON")?;

        debug!(
            candidates = parsed.candidates.len(),
            "generateContent response decoded"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate_text(&self, request: TextRequest) -> Result<GenerateContentResponse> {
        let body = GenerateContentRequest::from_text(&request);
        self.generate(&self.config.text_model, &body).await
    }

    async fn generate_speech(&self, request: SpeechRequest) -> Result<GenerateContentResponse> {
        let body = GenerateContentRequest::from_speech(&request);
        self.generate(&self.config.speech_model, &body).await
    }
}
