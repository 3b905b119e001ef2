//! bridgegap - draft messages for difficult conversations
//!
//! This crate provides:
//! - Prompt construction from a short form (recipient, tone, voice, language)
//! - A generative-language backend with web-search grounding and speech synthesis
//! - Response normalization with citation deduplication
//! - WAV export and PCM playback of synthesized speech
//! - An interactive session, a terminal shell and an HTTP API

pub mod audio;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod gemini;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod server;
pub mod session;
pub mod share;
pub mod shell;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::BridgeError;
pub use orchestrator::Orchestrator;
pub use types::{GeneratedContent, GenerationRequest, GroundingSource};
