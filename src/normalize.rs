//! Response normalization: generated text, citation sources, inline audio.
//!
//! Absence at any level of the envelope means "nothing there", never an
//! error.

use std::collections::HashSet;

use crate::gemini::{Candidate, GenerateContentResponse};
use crate::types::GroundingSource;

/// Shown when the initial generation returns no text.
pub const PLACEHOLDER_MESSAGE: &str = "I couldn't generate a message at this time.";

fn first_candidate(response: &GenerateContentResponse) -> Option<&Candidate> {
    response.candidates.first()
}

/// Concatenated text parts of the first candidate. `None` when there is no
/// text or it is blank.
pub fn response_text(response: &GenerateContentResponse) -> Option<String> {
    let content = first_candidate(response)?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Generated text, or `fallback` when absent.
pub fn message_or(response: &GenerateContentResponse, fallback: &str) -> String {
    response_text(response).unwrap_or_else(|| {
        tracing::warn!("response carried no text, using fallback");
        fallback.to_string()
    })
}

/// Web citations of the first candidate, deduplicated by `uri` with the
/// first occurrence kept. Chunks missing a title or uri are skipped.
pub fn grounding_sources(response: &GenerateContentResponse) -> Vec<GroundingSource> {
    let Some(metadata) = first_candidate(response).and_then(|c| c.grounding_metadata.as_ref())
    else {
        return Vec::new();
    };

    let sources = metadata.grounding_chunks.iter().filter_map(|chunk| {
        let web = chunk.web.as_ref()?;
        match (web.title.as_deref(), web.uri.as_deref()) {
            (Some(title), Some(uri)) if !title.is_empty() && !uri.is_empty() => {
                Some(GroundingSource {
                    title: title.to_string(),
                    uri: uri.to_string(),
                })
            }
            _ => None,
        }
    });

    dedup_by_uri(sources)
}

/// Keep the first source for each `uri`, preserving order.
pub fn dedup_by_uri(sources: impl IntoIterator<Item = GroundingSource>) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

/// Base64 audio payload: first candidate, first part, inline data.
pub fn inline_audio(response: &GenerateContentResponse) -> Option<String> {
    first_candidate(response)?
        .content
        .as_ref()?
        .parts
        .first()?
        .inline_data
        .as_ref()?
        .data
        .clone()
        .filter(|data| !data.is_empty())
}
