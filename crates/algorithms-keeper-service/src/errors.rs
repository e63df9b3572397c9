//! Error types for the HTTP service

use algorithms_keeper_core::error::{ApiError, AuthError, EventError, HandlerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Failure while handling one webhook delivery.
///
/// Every variant maps to an empty-bodied `500 Internal Server Error`; GitHub
/// records the failed delivery and an operator may redeliver it. The full
/// error chain is logged server-side and never sent to the caller.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// The delivery could not be authenticated or decoded
    #[error("Webhook rejected: {0}")]
    Rejected(#[from] EventError),

    /// A registered event handler failed
    #[error("Event handler failed: {0}")]
    HandlerFailed(#[source] HandlerError),
}

impl WebhookHandlerError {
    /// Check if the delivery was rejected before dispatch.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        error!(
            error = %self,
            trace = %error_chain(&self),
            "Webhook processing failed"
        );

        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Render an error and all of its sources, outermost first.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str("\n  caused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to build GitHub client: {0}")]
    Client(#[from] ApiError),

    #[error("Invalid GitHub App credentials: {0}")]
    Credentials(#[from] AuthError),
}

impl ServiceError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) | Self::Client(_) | Self::Credentials(_) => 3,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
