//! The user's input: selected files plus free-text metadata.
//!
//! [`FormState`] is a plain value. Hosts mutate it from their own input
//! events and pass it by reference to
//! [`crate::ConversionController::submit`], which reads it exactly once per
//! submission.

use serde::Serialize;
use std::collections::BTreeMap;

/// A selected file: original name, MIME type and contents.
///
/// Serialises as `{ file_name, mime_type, size }`; the bytes are never
/// written out.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    file_name: String,
    mime_type: String,
    size: usize,
    #[serde(skip)]
    data: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size: data.len(),
            data,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .finish()
    }
}

/// Snapshot of everything the user has entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    /// The audio file. Always required.
    pub audio: Option<Attachment>,
    /// Cover art. Required only by deployments that define a cover part.
    pub cover: Option<Attachment>,
    /// Metadata field name → value, e.g. `title`, `album`, `topic`.
    pub fields: BTreeMap<String, String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_audio(&mut self, file: Attachment) {
        self.audio = Some(file);
    }

    pub fn set_cover(&mut self, file: Attachment) {
        self.cover = Some(file);
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style [`FormState::set_field`].
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn with_audio(mut self, file: Attachment) -> Self {
        self.set_audio(file);
        self
    }

    pub fn with_cover(mut self, file: Attachment) -> Self {
        self.set_cover(file);
        self
    }

    /// Value of a metadata field; `None` when it was never set.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Back to the empty session-start state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
