//! Request building: map a validated [`FormState`] onto the deployment's
//! multipart field contract.
//!
//! ## Part order
//!
//! ```text
//! audio file ─▶ cover file ─▶ required text ─▶ non-empty optional text
//! ```
//!
//! Required text fields are always present, as an empty string when blank.
//! Optional text fields are left out entirely when blank: the service treats
//! an absent field as "use your default" and an empty one as "clear it".
//! Keys in the form that the contract does not name are ignored.
//!
//! Building is pure. The same form and deployment always yield the same
//! request.

use crate::config::Deployment;
use crate::error::ConvertError;
use crate::form::{Attachment, FormState};
use tracing::debug;

/// Contents of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    Text(String),
    File(Attachment),
}

/// One named multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub body: PartBody,
}

/// The multipart payload of one submission, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionRequest {
    pub parts: Vec<Part>,
}

impl ConversionRequest {
    /// Part names in wire order.
    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Value of a text part.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.part(name).map(|p| &p.body) {
            Some(PartBody::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Attachment of a file part.
    pub fn file(&self, name: &str) -> Option<&Attachment> {
        match self.part(name).map(|p| &p.body) {
            Some(PartBody::File(a)) => Some(a),
            _ => None,
        }
    }

    /// Payload size in bytes, text parts included.
    pub fn payload_bytes(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match &p.body {
                PartBody::File(a) => a.size(),
                PartBody::Text(s) => s.len(),
            })
            .sum()
    }
}

/// Build the multipart payload for `form`.
///
/// # Errors
/// [`ConvertError::Validation`] when a file the deployment needs is absent.
/// The controller validates first, so this only fires for direct callers.
pub fn build_request(
    form: &FormState,
    deployment: &Deployment,
) -> Result<ConversionRequest, ConvertError> {
    let missing = || ConvertError::Validation {
        reason: deployment.missing_files_message.clone(),
    };

    let mut parts = Vec::with_capacity(
        2 + deployment.required_fields.len() + deployment.optional_fields.len(),
    );

    let audio = form.audio.as_ref().ok_or_else(missing)?;
    parts.push(Part {
        name: deployment.audio_part.clone(),
        body: PartBody::File(audio.clone()),
    });

    if let Some(ref cover_part) = deployment.cover_part {
        let cover = form.cover.as_ref().ok_or_else(missing)?;
        parts.push(Part {
            name: cover_part.clone(),
            body: PartBody::File(cover.clone()),
        });
    }

    for name in &deployment.required_fields {
        parts.push(Part {
            name: name.clone(),
            body: PartBody::Text(form.field(name).unwrap_or_default().to_string()),
        });
    }

    for name in &deployment.optional_fields {
        match form.field(name) {
            Some(value) if !value.is_empty() => parts.push(Part {
                name: name.clone(),
                body: PartBody::Text(value.to_string()),
            }),
            _ => {}
        }
    }

    let request = ConversionRequest { parts };
    debug!(
        "Built request for '{}': parts={:?}",
        deployment.name,
        request.names()
    );
    Ok(request)
}
