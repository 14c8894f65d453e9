//! Input validation: the gate in front of the network.

use crate::config::Deployment;
use crate::form::FormState;

/// Result of checking a form against a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// Human-readable reason, shown verbatim as the status message.
    Invalid(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// Check that every file the deployment requires has been selected.
///
/// Metadata fields are never validated here; the service decides what an
/// empty title means.
pub fn validate(form: &FormState, deployment: &Deployment) -> Validation {
    let audio_missing = form.audio.is_none();
    let cover_missing = deployment.requires_cover() && form.cover.is_none();

    if audio_missing || cover_missing {
        Validation::Invalid(deployment.missing_files_message.clone())
    } else {
        Validation::Valid
    }
}
