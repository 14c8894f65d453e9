//! Configuration types for the conversion controller.
//!
//! Everything the controller needs to know about the service it talks to
//! lives in [`ControllerConfig`], built via its [`ControllerConfigBuilder`].
//! The field contract of the service (which multipart parts it expects,
//! which files are mandatory, how the download is named) is a
//! [`Deployment`]. Two deployments ship built in:
//!
//! | Deployment | Audio part | Cover | Text parts | Download name |
//! |------------|-----------|-------|------------|---------------|
//! | [`Deployment::metadata_tagging`] | `audio` | `cover` (required) | `title`, `album` + optional `artist`, `year`, `track`, `genre` | `<title>.mp3` |
//! | [`Deployment::topic_speaker`] | `audioFile` | none | `topic` + optional `speaker` | `<sanitised topic>.mp3` |

use crate::download::DownloadSink;
use crate::error::ConvertError;
use crate::pipeline::transport::Transport;
use crate::status::StatusCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Path the conversion service listens on.
pub const DEFAULT_ENDPOINT: &str = "/api/convert";

/// Where the service runs when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Configuration for a [`crate::ConversionController`].
///
/// # Example
/// ```rust
/// use audio_producer::{ControllerConfig, Deployment};
///
/// let config = ControllerConfig::builder()
///     .base_url("http://localhost:8000")
///     .deployment(Deployment::topic_speaker())
///     .output_dir("/tmp/converted")
///     .build()
///     .unwrap();
/// assert_eq!(config.url(), "http://localhost:8000/api/convert");
/// ```
#[derive(Clone)]
pub struct ControllerConfig {
    /// Scheme, host and port of the conversion service. Default: `http://127.0.0.1:8000`.
    pub base_url: String,

    /// Path of the conversion endpoint. Default: `/api/convert`.
    pub endpoint: String,

    /// Field contract and naming rule of the service. Default: metadata tagging.
    pub deployment: Deployment,

    /// Overall request timeout in seconds. Default: none.
    ///
    /// Without a timeout a hung service leaves the status in `Loading` until
    /// the connection drops or the submission is cancelled.
    pub request_timeout_secs: Option<u64>,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Directory the default filesystem sink writes downloads into. Default: `.`.
    pub output_dir: PathBuf,

    /// Pre-constructed transport. Takes precedence over the HTTP transport.
    pub transport: Option<Arc<dyn Transport>>,

    /// Pre-constructed download sink. Takes precedence over `output_dir`.
    pub sink: Option<Arc<dyn DownloadSink>>,

    /// Receives every status transition.
    pub status_observer: Option<StatusCallback>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            deployment: Deployment::default(),
            request_timeout_secs: None,
            user_agent: concat!("audio-producer/", env!("CARGO_PKG_VERSION")).to_string(),
            output_dir: PathBuf::from("."),
            transport: None,
            sink: None,
            status_observer: None,
        }
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment.name)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("output_dir", &self.output_dir)
            .field("transport", &self.transport.as_ref().map(|_| "<dyn Transport>"))
            .field("sink", &self.sink.as_ref().map(|_| "<dyn DownloadSink>"))
            .field(
                "status_observer",
                &self.status_observer.as_ref().map(|_| "<dyn StatusObserver>"),
            )
            .finish()
    }
}

impl ControllerConfig {
    /// Create a new builder for `ControllerConfig`.
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of the conversion endpoint.
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint)
    }
}

/// Builder for [`ControllerConfig`].
#[derive(Debug)]
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn endpoint(mut self, path: impl Into<String>) -> Self {
        self.config.endpoint = path.into();
        self
    }

    pub fn deployment(mut self, deployment: Deployment) -> Self {
        self.config.deployment = deployment;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DownloadSink>) -> Self {
        self.config.sink = Some(sink);
        self
    }

    pub fn status_observer(mut self, observer: StatusCallback) -> Self {
        self.config.status_observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ControllerConfig, ConvertError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ConvertError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if !c.endpoint.starts_with('/') {
            return Err(ConvertError::InvalidConfig(format!(
                "endpoint must start with '/', got '{}'",
                c.endpoint
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(ConvertError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.deployment.audio_part.is_empty() {
            return Err(ConvertError::InvalidConfig(format!(
                "deployment '{}' has no audio part name",
                c.deployment.name
            )));
        }
        Ok(self.config)
    }
}

// ── Deployment contract ──────────────────────────────────────────────────

/// The multipart field contract of one deployment of the conversion service.
///
/// Required text fields are always sent (as an empty string if the user left
/// them blank). Optional text fields are sent only when non-empty, so the
/// service can tell "not provided" apart from "explicitly cleared".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Short name used in logs.
    pub name: String,
    /// Part name of the audio file.
    pub audio_part: String,
    /// Part name of the cover image. `Some` makes the cover mandatory.
    pub cover_part: Option<String>,
    /// Text fields sent on every request, in order.
    pub required_fields: Vec<String>,
    /// Text fields sent only when non-empty, in order.
    pub optional_fields: Vec<String>,
    /// How the downloaded file is named.
    pub naming: NamingRule,
    /// Status message shown when a required file is missing.
    pub missing_files_message: String,
}

impl Default for Deployment {
    fn default() -> Self {
        Self::metadata_tagging()
    }
}

impl Deployment {
    /// Audio + cover art + ID3 tags. Downloads are named after the title.
    pub fn metadata_tagging() -> Self {
        Self {
            name: "metadata-tagging".into(),
            audio_part: "audio".into(),
            cover_part: Some("cover".into()),
            required_fields: vec!["title".into(), "album".into()],
            optional_fields: vec![
                "artist".into(),
                "year".into(),
                "track".into(),
                "genre".into(),
            ],
            naming: NamingRule::Verbatim {
                field: "title".into(),
            },
            missing_files_message: "Please select both audio and cover art files".into(),
        }
    }

    /// Audio plus a topic and speaker. Downloads are named after the
    /// topic with symbols stripped.
    pub fn topic_speaker() -> Self {
        Self {
            name: "topic-speaker".into(),
            audio_part: "audioFile".into(),
            cover_part: None,
            required_fields: vec!["topic".into()],
            optional_fields: vec!["speaker".into()],
            naming: NamingRule::StripSymbols {
                field: "topic".into(),
            },
            missing_files_message: "Please select an audio file".into(),
        }
    }

    /// Replace the naming rule.
    pub fn with_naming(mut self, naming: NamingRule) -> Self {
        self.naming = naming;
        self
    }

    /// Whether a cover image must be selected before submitting.
    pub fn requires_cover(&self) -> bool {
        self.cover_part.is_some()
    }

    /// Every text field the contract knows about, required first.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        self.required_fields
            .iter()
            .chain(self.optional_fields.iter())
            .map(String::as_str)
    }
}

/// How the name of a downloaded file is derived from the form.
///
/// The stem comes from one metadata field; the extension is always `.mp3`.
/// A missing or empty stem falls back to `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum NamingRule {
    /// Use the field value as-is.
    Verbatim { field: String },
    /// Drop every character that is neither alphanumeric nor whitespace,
    /// then trim.
    StripSymbols { field: String },
    /// Mirror the service's own filename rule: runs of unsafe characters
    /// become `_`, whitespace collapses, length is capped at 120 characters.
    SafeFilename { field: String },
}

impl NamingRule {
    /// The form field the stem is taken from.
    pub fn field(&self) -> &str {
        match self {
            NamingRule::Verbatim { field }
            | NamingRule::StripSymbols { field }
            | NamingRule::SafeFilename { field } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_api_convert() {
        let c = ControllerConfig::default();
        assert_eq!(c.url(), "http://127.0.0.1:8000/api/convert");
        assert_eq!(c.deployment, Deployment::metadata_tagging());
        assert!(c.request_timeout_secs.is_none());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let c = ControllerConfig::builder()
            .base_url("https://convert.example.com/")
            .build()
            .unwrap();
        assert_eq!(c.url(), "https://convert.example.com/api/convert");
    }

    #[test]
    fn build_rejects_bad_base_url() {
        let err = ControllerConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_relative_endpoint() {
        let err = ControllerConfig::builder()
            .endpoint("api/convert")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn build_rejects_zero_timeout() {
        assert!(ControllerConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn tagging_requires_cover_topic_does_not() {
        assert!(Deployment::metadata_tagging().requires_cover());
        assert!(!Deployment::topic_speaker().requires_cover());
    }

    #[test]
    fn text_fields_lists_required_first() {
        let d = Deployment::topic_speaker();
        assert_eq!(d.text_fields().collect::<Vec<_>>(), vec!["topic", "speaker"]);
    }

    #[test]
    fn naming_rule_serde_shape() {
        let rule = NamingRule::StripSymbols {
            field: "topic".into(),
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, r#"{"rule":"strip_symbols","field":"topic"}"#);
        let back: NamingRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn with_naming_changes_only_the_rule() {
        let d = Deployment::topic_speaker().with_naming(NamingRule::Verbatim {
            field: "title".into(),
        });
        assert_eq!(d.naming.field(), "title");
        assert_eq!(d.audio_part, "audioFile");
    }
}
