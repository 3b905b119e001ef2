//! Exporting audio and handing a message to other apps.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use tracing::{info, warn};

use crate::audio::{self, AudioError};
use crate::types::GeneratedContent;

/// File name used for every exported audio message.
pub const AUDIO_FILE_NAME: &str = "bridge_message.wav";

/// Shown after falling back to a clipboard copy.
pub const COPIED_INSTRUCTION: &str = "Message copied! Open Messenger and paste it.";

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Please listen to the audio first to generate it.")]
    NoAudio,

    #[error("Could not process audio for sharing.")]
    Audio(#[from] AudioError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a message ended up leaving the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Handed to the messaging app at this link.
    Opened(String),
    /// No share mechanism worked; copied to the clipboard instead.
    Copied,
}

/// Write the cached audio of `content` as a WAV file in `dir`.
pub fn export_audio(content: &GeneratedContent, dir: &Path) -> Result<PathBuf, ShareError> {
    let encoded = content.audio_base64.as_deref().ok_or(ShareError::NoAudio)?;
    let wav = audio::wav_from_base64(encoded)?;
    let path = dir.join(AUDIO_FILE_NAME);
    std::fs::write(&path, &wav).map_err(|source| ShareError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), bytes = wav.len(), "exported audio message");
    Ok(path)
}

/// WhatsApp deep link with `message` prefilled.
pub fn whatsapp_link(message: &str) -> String {
    format!(
        "https://wa.me/?text={}",
        utf8_percent_encode(message, URI_COMPONENT)
    )
}

/// Put `text` on the terminal's clipboard with an OSC 52 escape.
pub fn copy_to_clipboard(text: &str, out: &mut impl Write) -> io::Result<()> {
    write!(out, "\x1b]52;c;{}\x07", audio::bytes_to_base64(text.as_bytes()))?;
    out.flush()
}

/// Open the messaging deep link with `opener`; if that fails, copy the
/// message to the clipboard instead.
pub fn share_message_with(
    message: &str,
    opener: impl FnOnce(&str) -> io::Result<()>,
    out: &mut impl Write,
) -> io::Result<ShareOutcome> {
    let link = whatsapp_link(message);
    match opener(&link) {
        Ok(()) => {
            info!("opened messaging link");
            Ok(ShareOutcome::Opened(link))
        }
        Err(e) => {
            warn!(error = %e, "no share mechanism available, copying instead");
            copy_to_clipboard(message, out)?;
            Ok(ShareOutcome::Copied)
        }
    }
}

/// Share through the platform's URL opener.
pub fn share_message(message: &str, out: &mut impl Write) -> io::Result<ShareOutcome> {
    share_message_with(message, |link| open::that(link), out)
}
