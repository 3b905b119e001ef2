//! Core data model: the form fields a user submits and the content produced
//! from them.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who the message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum RecipientType {
    #[default]
    Parent,
    Grandparent,
    Partner,
    Friend,
    Relative,
    #[serde(rename = "Person of Authority")]
    #[value(name = "authority")]
    PersonOfAuthority,
    #[serde(rename = "General Society")]
    #[value(name = "society")]
    GeneralSociety,
}

impl RecipientType {
    pub fn label(&self) -> &'static str {
        match self {
            RecipientType::Parent => "Parent",
            RecipientType::Grandparent => "Grandparent",
            RecipientType::Partner => "Partner",
            RecipientType::Friend => "Friend",
            RecipientType::Relative => "Relative",
            RecipientType::PersonOfAuthority => "Person of Authority",
            RecipientType::GeneralSociety => "General Society",
        }
    }

    pub fn all() -> [RecipientType; 7] {
        [
            RecipientType::Parent,
            RecipientType::Grandparent,
            RecipientType::Partner,
            RecipientType::Friend,
            RecipientType::Relative,
            RecipientType::PersonOfAuthority,
            RecipientType::GeneralSociety,
        ]
    }
}

/// Desired register of the drafted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum ToneType {
    #[default]
    #[serde(rename = "Empathetic & Soft")]
    Empathetic,
    #[serde(rename = "Logical & Scientific")]
    Scientific,
    #[serde(rename = "Assertive but Kind")]
    Assertive,
    #[serde(rename = "Educational & Explanatory")]
    Educational,
}

impl ToneType {
    pub fn label(&self) -> &'static str {
        match self {
            ToneType::Empathetic => "Empathetic & Soft",
            ToneType::Scientific => "Logical & Scientific",
            ToneType::Assertive => "Assertive but Kind",
            ToneType::Educational => "Educational & Explanatory",
        }
    }

    pub fn all() -> [ToneType; 4] {
        [
            ToneType::Empathetic,
            ToneType::Scientific,
            ToneType::Assertive,
            ToneType::Educational,
        ]
    }
}

/// Prebuilt synthesis voice used for playback and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum VoiceOption {
    #[default]
    #[serde(rename = "Kore (Calm Female)")]
    Kore,
    #[serde(rename = "Zephyr (Energetic Female)")]
    Zephyr,
    #[serde(rename = "Puck (Soft Male/Young)")]
    Puck,
    #[serde(rename = "Charon (Deep Male)")]
    Charon,
    #[serde(rename = "Fenrir (Assertive Male)")]
    Fenrir,
}

impl VoiceOption {
    pub fn label(&self) -> &'static str {
        match self {
            VoiceOption::Kore => "Kore (Calm Female)",
            VoiceOption::Zephyr => "Zephyr (Energetic Female)",
            VoiceOption::Puck => "Puck (Soft Male/Young)",
            VoiceOption::Charon => "Charon (Deep Male)",
            VoiceOption::Fenrir => "Fenrir (Assertive Male)",
        }
    }

    /// Identifier of the prebuilt voice understood by the speech model.
    pub fn voice_name(&self) -> &'static str {
        match self {
            VoiceOption::Kore => "Kore",
            VoiceOption::Zephyr => "Zephyr",
            VoiceOption::Puck => "Puck",
            VoiceOption::Charon => "Charon",
            VoiceOption::Fenrir => "Fenrir",
        }
    }

    pub fn all() -> [VoiceOption; 5] {
        [
            VoiceOption::Kore,
            VoiceOption::Zephyr,
            VoiceOption::Puck,
            VoiceOption::Charon,
            VoiceOption::Fenrir,
        ]
    }
}

/// Output language of the drafted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum LanguageOption {
    #[default]
    English,
    #[serde(rename = "Nepali (Devanagari)")]
    #[value(name = "nepali")]
    NepaliScript,
    #[serde(rename = "Nepali (Romanized)")]
    #[value(name = "nepali-romanized")]
    NepaliRomanized,
    Thai,
}

impl LanguageOption {
    pub fn label(&self) -> &'static str {
        match self {
            LanguageOption::English => "English",
            LanguageOption::NepaliScript => "Nepali (Devanagari)",
            LanguageOption::NepaliRomanized => "Nepali (Romanized)",
            LanguageOption::Thai => "Thai",
        }
    }

    pub fn all() -> [LanguageOption; 4] {
        [
            LanguageOption::English,
            LanguageOption::NepaliScript,
            LanguageOption::NepaliRomanized,
            LanguageOption::Thai,
        ]
    }
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }
        )*
    };
}

display_label!(RecipientType, ToneType, VoiceOption, LanguageOption);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Please describe what you want to say first.")]
    EmptyInput,

    #[error("Please describe how the message should change.")]
    EmptyInstruction,
}

/// A submitted form. Immutable once built; editing produces a new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub user_input: String,
    #[serde(default)]
    pub recipient: RecipientType,
    #[serde(default)]
    pub tone: ToneType,
    #[serde(default)]
    pub voice: VoiceOption,
    #[serde(default)]
    pub language: LanguageOption,
}

impl GenerationRequest {
    /// Build a request, rejecting input that is empty after trimming.
    pub fn new(
        user_input: impl Into<String>,
        recipient: RecipientType,
        tone: ToneType,
        voice: VoiceOption,
        language: LanguageOption,
    ) -> Result<Self, RequestError> {
        let request = Self {
            user_input: user_input.into(),
            recipient,
            tone,
            voice,
            language,
        };
        request.validate()?;
        Ok(request)
    }

    /// Requests arriving over the wire bypass `new`; check them here.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.user_input.trim().is_empty() {
            return Err(RequestError::EmptyInput);
        }
        Ok(())
    }
}

/// One citation returned by the grounded generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// A drafted message as currently displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub message: String,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
    /// Base64 raw PCM for `message`, filled on first synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    pub original_request: GenerationRequest,
}

impl GeneratedContent {
    pub fn new(
        message: String,
        sources: Vec<GroundingSource>,
        original_request: GenerationRequest,
    ) -> Self {
        Self {
            message,
            sources,
            audio_base64: None,
            original_request,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_base64.is_some()
    }

    pub fn with_audio(mut self, audio_base64: String) -> Self {
        self.audio_base64 = Some(audio_base64);
        self
    }

    /// Drop cached audio; it no longer matches the text once the text changes.
    pub fn clear_audio(&mut self) {
        self.audio_base64 = None;
    }
}
