//! Error types for the audio-producer library.
//!
//! Every way a submission can fail is a variant of [`ConvertError`]. The
//! three categories the user actually sees are:
//!
//! * **Validation**: a required file is missing. Detected before any
//!   network activity.
//! * **Service**: the conversion service answered with a non-2xx status.
//!   The message is the `detail` the service put in its JSON body.
//! * **Transport**: the request never completed (connection refused, body
//!   could not be read, ...). The message is the underlying failure text.
//!
//! All of them are recoverable. The controller writes the error's
//! `Display` text into the status channel, so the `Display` of those
//! variants is the bare human-readable message with no prefix or code.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the audio-producer library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A file the deployment requires was not selected.
    #[error("{reason}")]
    Validation { reason: String },

    /// A file selected on the command line could not be loaded.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Service errors ────────────────────────────────────────────────────
    /// The service answered with a non-success status code.
    #[error("{detail}")]
    Service { status: u16, detail: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request failed before a complete response arrived.
    #[error("{message}")]
    Transport { message: String },

    /// The outstanding request was aborted through its cancellation token.
    #[error("Conversion cancelled")]
    Cancelled,

    /// Another submission is still outstanding on this controller.
    #[error("A conversion is already in progress")]
    Busy,

    // ── Output errors ─────────────────────────────────────────────────────
    /// The converted file could not be written to its destination.
    #[error("Failed to save download '{path}': {source}")]
    DownloadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Build a transport error from anything that displays.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        ConvertError::Transport {
            message: err.to_string(),
        }
    }

    /// The text written into the status channel for this error.
    pub fn status_message(&self) -> String {
        self.to_string()
    }

    /// HTTP status code returned by the service, if this is a service error.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ConvertError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ConvertError {
    fn from(e: reqwest::Error) -> Self {
        ConvertError::transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_is_bare_reason() {
        let e = ConvertError::Validation {
            reason: "Please select both audio and cover art files".into(),
        };
        assert_eq!(
            e.status_message(),
            "Please select both audio and cover art files"
        );
    }

    #[test]
    fn service_display_is_detail_verbatim() {
        let e = ConvertError::Service {
            status: 400,
            detail: "FFmpeg failed: invalid data".into(),
        };
        assert_eq!(e.to_string(), "FFmpeg failed: invalid data");
        assert_eq!(e.http_status(), Some(400));
    }

    #[test]
    fn transport_keeps_underlying_text() {
        let e = ConvertError::transport("connection refused");
        assert_eq!(e.status_message(), "connection refused");
        assert_eq!(e.http_status(), None);
    }

    #[test]
    fn cancelled_and_busy_display() {
        assert_eq!(ConvertError::Cancelled.to_string(), "Conversion cancelled");
        assert!(ConvertError::Busy.to_string().contains("already in progress"));
    }

    #[test]
    fn download_failed_display() {
        let e = ConvertError::DownloadFailed {
            path: PathBuf::from("/out/Song.mp3"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = e.to_string();
        assert!(msg.contains("Song.mp3"), "got: {msg}");
        assert!(msg.contains("denied"), "got: {msg}");
    }
}
