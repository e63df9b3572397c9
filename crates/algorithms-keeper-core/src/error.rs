//! Error types for webhook intake and GitHub API operations.
//!
//! Every failure that can reach the service's error boundary is one of the
//! enums defined here, or a [`HandlerError`] raised by application handlers.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error returned by application-provided event handlers.
///
/// Handlers may fail with any error type; it is boxed and propagated to the
/// service's error boundary unchanged.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while turning an HTTP request into an [`Event`](crate::event::Event).
#[derive(Debug, Error)]
pub enum EventError {
    /// The signature header is missing, malformed, or does not match the payload.
    #[error("Webhook authentication failed: {message}")]
    Authentication { message: String },

    /// The body is not a decodable payload or a required header is absent.
    #[error("Malformed webhook payload: {message}")]
    MalformedPayload { message: String },
}

impl EventError {
    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Check if this error is an authentication failure.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// Errors during GitHub API operations.
///
/// Variants other than [`ApiError::Transport`] are derived from the status
/// code of a response GitHub actually returned.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client error (network, TLS, timeout).
    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request URL could not be built.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Failed to encode a request body or decode a response body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 4xx response other than the more specific variants below.
    #[error("Bad request: {status} - {message}")]
    BadRequest { status: u16, message: String },

    /// 422 response; the request was well formed but semantically invalid.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// 403 response with an exhausted rate limit.
    #[error("Rate limit exceeded. Reset at: {reset_at}")]
    RateLimitExceeded { reset_at: DateTime<Utc> },

    /// 304 response for a resource with no cached representation.
    #[error("Resource not modified but no cached copy is available")]
    NotModified,

    /// 3xx response other than 304.
    #[error("Unexpected redirection: {status}")]
    Redirection { status: u16 },

    /// 5xx response.
    #[error("GitHub server error: {status} - {message}")]
    Server { status: u16, message: String },
}

impl ApiError {
    /// HTTP status code associated with this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { status, .. } => Some(*status),
            Self::Validation { .. } => Some(422),
            Self::RateLimitExceeded { .. } => Some(403),
            Self::NotModified => Some(304),
            Self::Redirection { status } => Some(*status),
            Self::Server { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl { .. } | Self::Json(_) => None,
        }
    }
}

/// GitHub App authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid private key format or data.
    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// JWT generation failed.
    #[error("JWT generation failed: {message}")]
    JwtGenerationFailed { message: String },

    /// The token exchange request failed.
    #[error("Installation token exchange failed: {0}")]
    Api(#[from] ApiError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
