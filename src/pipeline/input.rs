//! Input loading: turn a user-supplied path into an [`Attachment`].
//!
//! The service reads the original file name and the part's MIME type, so
//! both travel with the bytes. The MIME type is guessed from the extension,
//! the way a browser file picker reports it.

use crate::error::ConvertError;
use crate::form::Attachment;
use std::path::Path;
use tracing::{debug, warn};

/// MIME type sent when the extension is not recognised.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Guess a MIME type from a file name's extension (case-insensitive).
pub fn guess_mime(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("opus") => "audio/opus",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("aiff") | Some("aif") => "audio/aiff",
        Some("webm") => "audio/webm",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => FALLBACK_MIME,
    }
}

/// Read a file into an [`Attachment`].
///
/// The attachment keeps only the final path component as its name.
pub async fn load_attachment(path: impl AsRef<Path>) -> Result<Attachment, ConvertError> {
    let path = path.as_ref();

    let data = tokio::fs::read(path)
        .await
        .map_err(|source| ConvertError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let mime = guess_mime(&file_name);
    if mime == FALLBACK_MIME {
        warn!("Unrecognised extension for '{}', sending as {}", file_name, mime);
    }
    if data.is_empty() {
        warn!("'{}' is empty", path.display());
    }

    debug!("Loaded {} ({} bytes, {})", path.display(), data.len(), mime);
    Ok(Attachment::new(file_name, mime, data))
}
