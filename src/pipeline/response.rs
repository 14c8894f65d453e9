//! Response handling: turn a [`TransportResponse`] into a [`Download`] or
//! a [`ConvertError`].
//!
//! ## Error bodies
//!
//! The service reports failures as JSON with a `detail` member. Two shapes
//! occur in practice:
//!
//! ```text
//! {"detail": "FFmpeg failed: ..."}                      handler errors
//! {"detail": [{"loc": [...], "msg": "field required"}]}  request validation
//! ```
//!
//! | `detail`                      | Status message                 |
//! |-------------------------------|--------------------------------|
//! | non-empty string              | the string, verbatim           |
//! | list of `{"msg": ...}`        | the `msg` values joined by `; `|
//! | non-zero number, `true`       | its JSON text, e.g. `42`       |
//! | `""`, `0`, `false`, `null`, object, absent | [`GENERIC_FAILURE_MESSAGE`] |
//!
//! An empty or non-JSON body also becomes [`GENERIC_FAILURE_MESSAGE`].

use crate::config::Deployment;
use crate::download::Download;
use crate::error::ConvertError;
use crate::form::FormState;
use crate::pipeline::transport::TransportResponse;
use serde_json::Value;
use tracing::{debug, warn};

/// Status message for a failed response without a usable `detail`.
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed";

/// Interpret a complete response.
///
/// 2xx bodies become a [`Download`] named by the deployment's rule. Every
/// other status becomes [`ConvertError::Service`] carrying the extracted
/// detail.
pub fn interpret(
    response: TransportResponse,
    form: &FormState,
    deployment: &Deployment,
) -> Result<Download, ConvertError> {
    if !response.is_success() {
        let detail = extract_error_detail(&response.body);
        warn!("Service returned HTTP {}: {}", response.status, detail);
        return Err(ConvertError::Service {
            status: response.status,
            detail,
        });
    }

    let file_name = deployment.naming.download_name(form);
    debug!(
        "Conversion succeeded: {} bytes → '{}'",
        response.body.len(),
        file_name
    );

    Ok(Download {
        file_name,
        content_type: response.content_type,
        data: response.body,
    })
}

/// Pull a human-readable message out of an error body.
pub fn extract_error_detail(body: &[u8]) -> String {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return GENERIC_FAILURE_MESSAGE.to_string(),
    };

    match parsed.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                GENERIC_FAILURE_MESSAGE.to_string()
            } else {
                messages.join("; ")
            }
        }
        _ => GENERIC_FAILURE_MESSAGE.to_string(),
    }
}
