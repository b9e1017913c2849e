//! Serverless event adapter.
//!
//! One invocation in, one response envelope out. The request body is a
//! base64-encoded `multipart/form-data` payload; the response body is the
//! base64-encoded JPEG.
//!
//! ## Request Checks
//!
//! Checks run in this order and the first failure wins:
//!
//! ```text
//! body.len() * 3/4 > 5 MiB      413  before any decoding
//! no headers                    400
//! content-type not form-data    400
//! no body                       400
//! body not base64               400
//! body not multipart            400
//! form fields                   400  (see `form`)
//! engine                        400 / 500
//! JPEG > 4 MiB                  413
//! ```
//!
//! Both limits keep the envelope under the platform's synchronous payload
//! ceiling once base64 overhead is added.

use crate::compress::CompressError;
use crate::form::{FormRules, UploadForm};
use crate::imaging::{ImageBackend, RustBackend};
use crate::multipart;
use crate::output::format_mb;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info, warn};

/// Largest accepted request payload, measured as approximate decoded bytes.
pub const MAX_EVENT_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Largest JPEG returned in a response envelope.
pub const MAX_EVENT_RESULT_BYTES: usize = 4 * 1024 * 1024;

/// Incoming invocation envelope. Other envelope fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_base64_encoded: bool,
}

impl EventResponse {
    fn jpeg(encoded: &[u8]) -> Self {
        let mut headers = cors_headers();
        headers.insert("Content-Type".into(), "image/jpeg".into());
        headers.insert("Content-Length".into(), encoded.len().to_string());
        Self {
            status_code: 200,
            headers,
            body: STANDARD.encode(encoded),
            is_base64_encoded: true,
        }
    }

    fn error(status_code: u16, message: &str) -> Self {
        let mut headers = cors_headers();
        headers.insert("Content-Type".into(), "application/json".into());
        Self {
            status_code,
            headers,
            body: serde_json::json!({ "error": message }).to_string(),
            is_base64_encoded: false,
        }
    }

    fn from_compress_error(err: &CompressError) -> Self {
        if err.is_server_error() {
            error!(error = %err, "event compression failed");
        } else {
            warn!(status = err.status_code(), error = %err, "event rejected");
        }
        Self::error(err.status_code(), &err.public_message())
    }
}

fn cors_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ("Access-Control-Allow-Headers".to_string(), "Content-Type".to_string()),
        ("Access-Control-Allow-Methods".to_string(), "POST, OPTIONS".to_string()),
    ])
}

/// Handle one invocation with the production backend.
pub fn handle_event(request: &EventRequest) -> EventResponse {
    handle_event_with_backend(&RustBackend::new(), request)
}

/// Handle one invocation using a specific backend (allows testing with mock).
pub fn handle_event_with_backend(backend: &impl ImageBackend, request: &EventRequest) -> EventResponse {
    match process(backend, request) {
        Ok(encoded) => EventResponse::jpeg(&encoded),
        Err(err) => EventResponse::from_compress_error(&err),
    }
}

fn process(backend: &impl ImageBackend, request: &EventRequest) -> Result<Vec<u8>, CompressError> {
    let body = request.body.as_deref().filter(|b| !b.is_empty());

    if let Some(body) = body {
        let approx_decoded = body.len() * 3 / 4;
        info!(payload = %format_mb(approx_decoded), "event received");
        if body.len() * 3 > MAX_EVENT_PAYLOAD_BYTES * 4 {
            return Err(CompressError::PayloadTooLarge(format!(
                "Payload too large: {}. Maximum allowed: 5 MB",
                format_mb(approx_decoded)
            )));
        }
    }

    let headers = request
        .headers
        .as_ref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| CompressError::validation("No headers provided in the request"))?;

    let content_type = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.as_str())
        .filter(|value| is_form_data(value))
        .ok_or_else(|| CompressError::validation("Content-Type must be multipart/form-data"))?;

    let body = body.ok_or_else(|| CompressError::validation("No body provided in the request"))?;

    let raw_body = decode_base64(body).map_err(|err| {
        warn!(%err, "base64 decode failed");
        CompressError::validation("Invalid base64 encoding in request body")
    })?;
    info!(decoded = %format_mb(raw_body.len()), "body decoded");

    let parts = multipart::parse_form(content_type, &raw_body).map_err(|err| {
        warn!(%err, "multipart parse failed");
        CompressError::validation("Invalid multipart form data")
    })?;

    let request = UploadForm::from_parts(&parts).into_request(FormRules::EVENT)?;
    info!(quality = request.requested_quality, filename = ?request.filename, "compress requested");
    let result = request.compress_with_backend(backend)?;

    if result.encoded_size_bytes > MAX_EVENT_RESULT_BYTES {
        return Err(CompressError::PayloadTooLarge(format!(
            "Compressed image too large: {}. Try reducing compress_size or image dimensions.",
            format_mb(result.encoded_size_bytes)
        )));
    }
    Ok(result.encoded_bytes)
}

fn is_form_data(content_type: &str) -> bool {
    const PREFIX: &str = "multipart/form-data";
    content_type
        .get(..PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX))
}

/// Standard alphabet, padded. Line breaks from wrapping encoders are skipped.
fn decode_base64(body: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if body.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(body)
    }
}
