//! Prompt construction for the initial draft and for refinements.
//!
//! Pure functions of their inputs. Callers guarantee `user_input` is
//! non-empty (see [`GenerationRequest::validate`]).

use crate::types::{GenerationRequest, LanguageOption};

/// System instruction attached to the initial generation call.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a specialized app helping bridge communication gaps with science and empathy.";

/// Output-language directive embedded in every prompt.
pub fn language_instruction(language: LanguageOption) -> &'static str {
    match language {
        LanguageOption::English => "Output the message in English.",
        LanguageOption::NepaliScript => {
            "Output the final message primarily in Nepali language using Devanagari script."
        }
        LanguageOption::NepaliRomanized => {
            "Output the final message in Nepali language but write it using English/Roman characters (Romanized Nepali)."
        }
        LanguageOption::Thai => "Output the final message in Thai language.",
    }
}

/// Prompt asking for a first-person, empathetic, research-backed draft.
pub fn generation_prompt(request: &GenerationRequest) -> String {
    format!(
        r#"You are an expert communication coach, scientist, and mediator.
The user is struggling to explain a concept, feeling, or need to a specific recipient.

User's Raw Thought: "{input}"
Target Recipient: {recipient}
Desired Tone: {tone}
Target Language: {language}

Task:
1. Draft a message (written in the first person "I") that the user can send to the recipient.
2. The message MUST be empathetic, loving, and supportive.
3. TONE: Make it conversational, authentic, and grounded. Do NOT use overly poetic, flowery, or formal language. It should sound like a real person talking naturally, just more articulate.
4. LENGTH: Keep it concise and to the point. Only expand when explaining the scientific/psychological backing.
5. CRITICAL: Integrate scientific backing, psychological concepts, or sociological research to validate the user's feelings or stance. Explain *why* this is valid using facts (e.g., dopamine in gaming, psychological need for boundaries).
6. {directive}

Output Format:
Return ONLY the drafted message text. Do not add intro/outro."#,
        input = request.user_input,
        recipient = request.recipient,
        tone = request.tone,
        language = request.language,
        directive = language_instruction(request.language),
    )
}

/// Prompt asking for a rewrite of `current_message` that applies
/// `instruction` while keeping the scientific grounding and tone.
pub fn refinement_prompt(
    current_message: &str,
    instruction: &str,
    original: &GenerationRequest,
) -> String {
    format!(
        r#"You are refining a previously generated message.

Original Message: "{current_message}"
User's Refinement Instruction: "{instruction}"

Context:
Recipient: {recipient}
Tone: {tone}

Task:
Rewrite the message applying the user's refinement instruction.
Maintain the scientific backing but keep the tone conversational, authentic, and concise (unless asked to expand).
Avoid formal or poetic language.
{directive}

Output ONLY the new message."#,
        recipient = original.recipient,
        tone = original.tone,
        directive = language_instruction(original.language),
    )
}
