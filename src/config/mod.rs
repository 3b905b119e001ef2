//! Configuration loading.
//!
//! Settings live in `config.toml` (platform config dir, or `--config`).
//! The API key is never read from the file; it comes from the environment
//! (`GEMINI_API_KEY` / `API_KEY`) or the `--api-key` flag.

pub mod schema;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub export: ExportConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub text_model: String,
    pub speech_model: String,
    /// Filled from the environment at startup, never from the file.
    #[serde(skip)]
    pub api_key: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            api_key: String::new(),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("speech_model", &self.speech_model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exported WAV files are written to.
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Default config file location, e.g. `~/.config/bridgegap/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("app", "bridgegap", "bridgegap")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        schema::validate(&config)?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Attach the API credential resolved by the CLI layer.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key {
            self.gemini.api_key = key.trim().to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.gemini.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.gemini.text_model, "gemini-3-pro-preview");
        assert_eq!(config.gemini.speech_model, "gemini-2.5-flash-preview-tts");
        assert_eq!(config.server.bind, "127.0.0.1:8787");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [gemini]
            text_model = "gemini-2.5-pro"

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.gemini.text_model, "gemini-2.5-pro");
        assert_eq!(config.gemini.speech_model, DEFAULT_SPEECH_MODEL);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn api_key_is_not_read_from_file() {
        let config = Config::from_toml(
            r#"
            [gemini]
            api_key = "from-file"
            "#,
        )
        .unwrap();
        assert!(config.gemini.api_key.is_empty());
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let config = Config::default().with_api_key(Some(" secret-key \n".into()));
        assert_eq!(config.gemini.api_key, "secret-key");
        let debug = format!("{:?}", config.gemini);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbind = \"0.0.0.0:9000\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
