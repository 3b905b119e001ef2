//! Configuration schema validation and helpers

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use url::Url;

use super::Config;

/// Check a loaded config before anything uses it.
pub fn validate(config: &Config) -> Result<()> {
    parse_base_url(&config.gemini.base_url)?;
    validate_model(&config.gemini.text_model, "gemini.text_model")?;
    validate_model(&config.gemini.speech_model, "gemini.speech_model")?;
    parse_bind(&config.server.bind)?;
    Ok(())
}

/// Parse an API base URL like "https://host/v1beta". Only http(s) is allowed.
pub fn parse_base_url(s: &str) -> Result<Url> {
    let url = Url::parse(s).with_context(|| format!("Invalid base URL: {}", s))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("Unsupported base URL scheme: {}", other),
    }
}

/// Model ids are path segments, so no slashes or whitespace.
pub fn validate_model(model: &str, field: &str) -> Result<()> {
    if model.is_empty() {
        bail!("{} must not be empty", field);
    }
    if model.contains('/') || model.chars().any(char::is_whitespace) {
        bail!("Invalid model id for {}: {}", field, model);
    }
    Ok(())
}

/// Parse a bind address like "127.0.0.1:8787".
pub fn parse_bind(s: &str) -> Result<SocketAddr> {
    s.parse()
        .with_context(|| format!("Invalid bind address: {}. Expected HOST:PORT", s))
}

/// The credential must be present before any API call is attempted.
pub fn require_api_key(config: &Config) -> Result<&str> {
    let key = config.gemini.api_key.as_str();
    if key.is_empty() {
        bail!("No API key configured. Set GEMINI_API_KEY (or API_KEY) or pass --api-key.");
    }
    Ok(key)
}
