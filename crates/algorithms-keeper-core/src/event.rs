//! Webhook event envelope parsing and signature validation.
//!
//! An [`Event`] is built once per inbound request from the raw headers, the
//! raw body bytes and the webhook secret. Parsing is a pure function of those
//! inputs: the signature is verified first, then the body is decoded.
//!
//! # Signatures
//!
//! GitHub signs every delivery with HMAC-SHA256 (`X-Hub-Signature-256`) and,
//! for older integrations, HMAC-SHA1 (`X-Hub-Signature`). The SHA-256 header
//! is preferred whenever both are present. Digests are compared in constant
//! time.
//!
//! # Examples
//!
//! ```rust
//! use algorithms_keeper_core::event::{Event, EVENT_HEADER, DELIVERY_HEADER, SIGNATURE_256_HEADER};
//! use algorithms_keeper_core::event::sign_sha256;
//! use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
//!
//! let body = br#"{"action":"opened","number":1}"#;
//! let mut headers = HeaderMap::new();
//! headers.insert(EVENT_HEADER, HeaderValue::from_static("pull_request"));
//! headers.insert(DELIVERY_HEADER, HeaderValue::from_static("72d3162e"));
//! headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
//! headers.insert(
//!     SIGNATURE_256_HEADER,
//!     HeaderValue::from_str(&sign_sha256(body, "secret")).unwrap(),
//! );
//!
//! let event = Event::from_http(&headers, body, "secret").unwrap();
//! assert_eq!(event.event_type(), "pull_request");
//! assert_eq!(event.action(), Some("opened"));
//! ```

use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde_json::Value;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::EventError;

/// Header naming the event category.
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the unique delivery identifier.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Header carrying the HMAC-SHA256 signature (`sha256=<hex>`).
pub const SIGNATURE_256_HEADER: &str = "x-hub-signature-256";

/// Legacy header carrying the HMAC-SHA1 signature (`sha1=<hex>`).
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// Event type GitHub sends when a webhook is first configured.
pub const PING_EVENT: &str = "ping";

/// A parsed, authenticated webhook delivery.
///
/// The payload is kept as an untyped JSON value; handlers narrow it to the
/// shape they expect.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: String,
    delivery_id: String,
    payload: Value,
    action: Option<String>,
}

impl Event {
    /// Create an event from already-decoded parts.
    ///
    /// The action is taken from the payload's top-level `"action"` string.
    pub fn new(event_type: impl Into<String>, delivery_id: impl Into<String>, payload: Value) -> Self {
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            event_type: event_type.into(),
            delivery_id: delivery_id.into(),
            payload,
            action,
        }
    }

    /// Build an event from an HTTP request.
    ///
    /// # Errors
    ///
    /// * [`EventError::Authentication`] when the signature header is missing,
    ///   malformed, or does not match `body` under `secret`.
    /// * [`EventError::MalformedPayload`] when the event or delivery header is
    ///   missing, the content type is unsupported, or the body is not a JSON
    ///   object.
    pub fn from_http(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<Self, EventError> {
        let signature = signature_header(headers)?;
        validate_signature(body, signature, secret)?;

        let event_type = required_header(headers, EVENT_HEADER)?;
        let delivery_id = required_header(headers, DELIVERY_HEADER)?;
        let payload = decode_body(headers, body)?;

        Ok(Self::new(event_type, delivery_id, payload))
    }

    /// Event category, e.g. `"pull_request"`.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Delivery identifier assigned by GitHub.
    pub fn delivery_id(&self) -> &str {
        &self.delivery_id
    }

    /// Decoded payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The payload's `"action"` field, when present.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Check if this is the liveness ping GitHub sends on webhook creation.
    pub fn is_ping(&self) -> bool {
        self.event_type == PING_EVENT
    }

    /// Installation the delivery belongs to, from `installation.id`.
    pub fn installation_id(&self) -> Option<u64> {
        self.payload
            .get("installation")
            .and_then(|i| i.get("id"))
            .and_then(Value::as_u64)
    }
}

/// Verify a signature header value against the payload.
///
/// Accepts `sha256=<hex>` and `sha1=<hex>` forms.
pub fn validate_signature(payload: &[u8], signature: &str, secret: &str) -> Result<(), EventError> {
    let (algorithm, hex_digest) = signature
        .split_once('=')
        .ok_or_else(|| EventError::authentication("signature has no algorithm prefix"))?;

    let provided = hex::decode(hex_digest)
        .map_err(|e| EventError::authentication(format!("signature is not valid hex: {}", e)))?;

    let expected = match algorithm {
        "sha256" => hmac_sha256(payload, secret)?,
        "sha1" => hmac_sha1(payload, secret)?,
        other => {
            return Err(EventError::authentication(format!(
                "unsupported signature algorithm '{}'",
                other
            )))
        }
    };

    if constant_time_compare(&provided, &expected) {
        Ok(())
    } else {
        Err(EventError::authentication("signature does not match payload"))
    }
}

/// Compute the `sha256=<hex>` signature GitHub would send for `payload`.
pub fn sign_sha256(payload: &[u8], secret: &str) -> String {
    let digest = hmac_sha256(payload, secret).unwrap_or_default();
    format!("sha256={}", hex::encode(digest))
}

/// Compute the legacy `sha1=<hex>` signature for `payload`.
pub fn sign_sha1(payload: &[u8], secret: &str) -> String {
    let digest = hmac_sha1(payload, secret).unwrap_or_default();
    format!("sha1={}", hex::encode(digest))
}

fn hmac_sha256(payload: &[u8], secret: &str) -> Result<Vec<u8>, EventError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| EventError::authentication(format!("secret rejected as HMAC key: {}", e)))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_sha1(payload: &[u8], secret: &str) -> Result<Vec<u8>, EventError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| EventError::authentication(format!("secret rejected as HMAC key: {}", e)))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    // Length is not secret.
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn signature_header(headers: &HeaderMap) -> Result<&str, EventError> {
    let value = headers
        .get(SIGNATURE_256_HEADER)
        .or_else(|| headers.get(SIGNATURE_HEADER))
        .ok_or_else(|| EventError::authentication("signature is missing"))?;

    value
        .to_str()
        .map_err(|_| EventError::authentication("signature header is not ASCII"))
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, EventError> {
    let value = headers
        .get(name)
        .ok_or_else(|| EventError::malformed(format!("missing {} header", name)))?;

    let value = value
        .to_str()
        .map_err(|_| EventError::malformed(format!("{} header is not ASCII", name)))?
        .trim();

    if value.is_empty() {
        return Err(EventError::malformed(format!("{} header is empty", name)));
    }
    Ok(value)
}

fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, EventError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .ok_or_else(|| EventError::malformed("missing content-type header"))?;

    let payload: Value = match content_type.as_str() {
        "application/json" => serde_json::from_slice(body)
            .map_err(|e| EventError::malformed(format!("body is not valid JSON: {}", e)))?,
        "application/x-www-form-urlencoded" => {
            let (_, document) = url::form_urlencoded::parse(body)
                .find(|(key, _)| key == "payload")
                .ok_or_else(|| EventError::malformed("form body has no 'payload' field"))?;
            serde_json::from_str(&document).map_err(|e| {
                EventError::malformed(format!("form payload is not valid JSON: {}", e))
            })?
        }
        other => {
            return Err(EventError::malformed(format!(
                "unsupported content type '{}'",
                other
            )))
        }
    };

    if !payload.is_object() {
        return Err(EventError::malformed("payload is not a JSON object"));
    }
    Ok(payload)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
