//! Download naming: derive the saved file name from the form.
//!
//! Each [`NamingRule`] reads one metadata field and turns it into a file
//! stem; `.mp3` is appended because the service always answers with MP3.
//! Deployments disagree on how much cleaning the stem gets, which is why the
//! rule is part of the deployment rather than a global policy:
//!
//! | Rule | `"My Talk! #1"` | `""` / missing |
//! |------|-----------------|----------------|
//! | `Verbatim`     | `My Talk! #1.mp3` | `output.mp3` |
//! | `StripSymbols` | `My Talk 1.mp3`   | `output.mp3` |
//! | `SafeFilename` | `My Talk_ _1.mp3` | `output.mp3` |

use crate::config::NamingRule;
use crate::form::FormState;
use once_cell::sync::Lazy;
use regex::Regex;

/// Extension of every download.
pub const DOWNLOAD_EXTENSION: &str = "mp3";

/// Stem used when the rule produces nothing.
pub const FALLBACK_STEM: &str = "output";

/// Maximum stem length (in characters) under [`NamingRule::SafeFilename`].
pub const SAFE_STEM_MAX_CHARS: usize = 120;

impl NamingRule {
    /// File stem for `form`, without extension.
    pub fn stem(&self, form: &FormState) -> String {
        let raw = form.field(self.field()).unwrap_or_default();
        let stem = match self {
            NamingRule::Verbatim { .. } => raw.to_string(),
            NamingRule::StripSymbols { .. } => strip_symbols(raw),
            NamingRule::SafeFilename { .. } => safe_filename(raw),
        };
        if stem.is_empty() {
            FALLBACK_STEM.to_string()
        } else {
            stem
        }
    }

    /// Full download name for `form`, e.g. `Song.mp3`.
    pub fn download_name(&self, form: &FormState) -> String {
        format!("{}.{}", self.stem(form), DOWNLOAD_EXTENSION)
    }
}

// ── StripSymbols ─────────────────────────────────────────────────────────────

/// Keep alphanumerics and whitespace, then trim the ends.
fn strip_symbols(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

// ── SafeFilename ─────────────────────────────────────────────────────────────

static RE_UNSAFE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-. ]+").unwrap());
static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Same output as the service's `Content-Disposition` name for this value.
fn safe_filename(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }
    let replaced = RE_UNSAFE_RUN.replace_all(value, "_");
    let collapsed = RE_WHITESPACE_RUN.replace_all(replaced.trim(), " ");
    collapsed.chars().take(SAFE_STEM_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verbatim(field: &str) -> NamingRule {
        NamingRule::Verbatim { field: field.into() }
    }

    fn strip(field: &str) -> NamingRule {
        NamingRule::StripSymbols { field: field.into() }
    }

    fn safe(field: &str) -> NamingRule {
        NamingRule::SafeFilename { field: field.into() }
    }

    #[test]
    fn verbatim_title() {
        let form = FormState::new().with_field("title", "Song");
        assert_eq!(verbatim("title").download_name(&form), "Song.mp3");
    }

    #[test]
    fn verbatim_empty_or_missing_falls_back() {
        assert_eq!(
            verbatim("title").download_name(&FormState::new().with_field("title", "")),
            "output.mp3"
        );
        assert_eq!(verbatim("title").download_name(&FormState::new()), "output.mp3");
    }

    #[test]
    fn verbatim_on_field_the_deployment_lacks() {
        // A topic form named by title never has a title.
        let form = FormState::new().with_field("topic", "Keynote");
        assert_eq!(verbatim("title").download_name(&form), "output.mp3");
    }

    #[test]
    fn strip_symbols_topic() {
        let form = FormState::new().with_field("topic", "My Talk! #1");
        assert_eq!(strip("topic").download_name(&form), "My Talk 1.mp3");
    }

    #[test]
    fn strip_symbols_trims_and_falls_back() {
        let form = FormState::new().with_field("topic", "  ¿Qué tal?  ");
        assert_eq!(strip("topic").stem(&form), "Qué tal");

        let form = FormState::new().with_field("topic", " !?# ");
        assert_eq!(strip("topic").download_name(&form), "output.mp3");
    }

    #[test]
    fn safe_filename_replaces_unsafe_runs() {
        let form = FormState::new().with_field("title", "Song: With/Special\\Characters?!");
        assert_eq!(
            safe("title").download_name(&form),
            "Song_ With_Special_Characters_.mp3"
        );
    }

    #[test]
    fn safe_filename_collapses_whitespace() {
        let form = FormState::new().with_field("title", "  My   Song\tTitle ");
        assert_eq!(safe("title").stem(&form), "My Song Title");
    }

    #[test]
    fn safe_filename_whitespace_only_is_output() {
        let form = FormState::new().with_field("title", "   ");
        assert_eq!(safe("title").download_name(&form), "output.mp3");
    }

    #[test]
    fn safe_filename_caps_length() {
        let form = FormState::new().with_field("title", "é".repeat(300));
        assert_eq!(safe("title").stem(&form).chars().count(), SAFE_STEM_MAX_CHARS);
    }
}
