//! Transport: deliver one [`ConversionRequest`] and collect one response.
//!
//! The controller only talks to the [`Transport`] trait, so tests and
//! embedding hosts can swap the network out entirely. [`HttpTransport`] is
//! the real implementation: a single `multipart/form-data` POST via
//! `reqwest`. It never retries; a failed call is reported once and the user
//! decides whether to submit again.

use crate::config::ControllerConfig;
use crate::error::ConvertError;
use crate::pipeline::request::{ConversionRequest, PartBody};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a conversion request and waits for the complete response.
///
/// Implementations must return `Ok` for every response that arrived,
/// whatever its status code, and `Err(ConvertError::Transport)` only when
/// no complete response could be read.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ConversionRequest) -> Result<TransportResponse, ConvertError>;
}

/// `reqwest`-backed transport posting to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &ControllerConfig) -> Result<Self, ConvertError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ConvertError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ConversionRequest) -> Result<TransportResponse, ConvertError> {
        let start = Instant::now();
        let payload_bytes = request.payload_bytes();
        let form = to_multipart(request)?;

        info!("POST {} ({} bytes)", self.url, payload_bytes);
        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The whole body is awaited here, for errors as well as successes.
        let body = response.bytes().await?.to_vec();

        debug!(
            "HTTP {} ({} bytes, {:?}) in {}ms",
            status,
            body.len(),
            content_type,
            start.elapsed().as_millis()
        );

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Convert the request into a `reqwest` multipart form, preserving order.
pub fn to_multipart(request: ConversionRequest) -> Result<Form, ConvertError> {
    let mut form = Form::new();
    for part in request.parts {
        form = match part.body {
            PartBody::Text(value) => form.text(part.name, value),
            PartBody::File(file) => {
                let file_part = Part::bytes(file.data().to_vec())
                    .file_name(file.file_name().to_string())
                    .mime_str(file.mime_type())
                    .map_err(|e| {
                        ConvertError::transport(format!(
                            "invalid MIME type '{}' for '{}': {e}",
                            file.mime_type(),
                            file.file_name()
                        ))
                    })?;
                form.part(part.name, file_part)
            }
        };
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Attachment;
    use crate::pipeline::request::Part as RequestPart;

    #[test]
    fn success_range() {
        let mk = |status| TransportResponse {
            status,
            content_type: None,
            body: vec![],
        };
        assert!(mk(200).is_success());
        assert!(mk(204).is_success());
        assert!(!mk(199).is_success());
        assert!(!mk(302).is_success());
        assert!(!mk(422).is_success());
    }

    #[test]
    fn http_transport_uses_config_url() {
        let config = ControllerConfig::builder()
            .base_url("http://localhost:9999")
            .request_timeout_secs(5)
            .build()
            .unwrap();
        let t = HttpTransport::new(&config).unwrap();
        assert_eq!(t.url(), "http://localhost:9999/api/convert");
    }

    #[test]
    fn multipart_has_a_boundary() {
        let request = ConversionRequest {
            parts: vec![
                RequestPart {
                    name: "audio".into(),
                    body: PartBody::File(Attachment::new("a.wav", "audio/wav", vec![0; 4])),
                },
                RequestPart {
                    name: "title".into(),
                    body: PartBody::Text("Song".into()),
                },
            ],
        };
        let form = to_multipart(request).unwrap();
        assert!(!form.boundary().is_empty());
    }

    #[test]
    fn bad_mime_is_transport_error() {
        let request = ConversionRequest {
            parts: vec![RequestPart {
                name: "audio".into(),
                body: PartBody::File(Attachment::new("a.wav", "not a mime", vec![])),
            }],
        };
        let err = to_multipart(request).unwrap_err();
        assert!(matches!(err, ConvertError::Transport { .. }));
    }
}
