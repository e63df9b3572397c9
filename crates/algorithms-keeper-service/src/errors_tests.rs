//! Tests for error-to-response mapping.

use super::*;
use axum::body::to_bytes;

#[derive(Debug, thiserror::Error)]
#[error("outer failure")]
struct Outer(#[source] std::io::Error);

async fn status_and_body(error: WebhookHandlerError) -> (StatusCode, bytes::Bytes) {
    let response = error.into_response();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body)
}

mod response_tests {
    use super::*;

    /// Verify rejected deliveries answer an empty 500.
    #[tokio::test]
    async fn test_rejected_is_empty_500() {
        let error = WebhookHandlerError::from(EventError::Authentication {
            message: "signature mismatch".to_string(),
        });
        assert!(error.is_rejected());

        let (status, body) = status_and_body(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
    }

    /// Verify handler failures answer an empty 500 without leaking details.
    #[tokio::test]
    async fn test_handler_failure_is_empty_500() {
        let error = WebhookHandlerError::HandlerFailed("database password is hunter2".into());
        assert!(!error.is_rejected());

        let (status, body) = status_and_body(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
    }
}

mod chain_tests {
    use super::*;

    /// Verify every source in the chain is rendered in order.
    #[test]
    fn test_error_chain_includes_sources() {
        let error = WebhookHandlerError::HandlerFailed(Box::new(Outer(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))));

        let chain = error_chain(&error);
        let lines: Vec<&str> = chain.lines().collect();
        assert_eq!(lines[0], "Event handler failed: outer failure");
        assert_eq!(lines[1], "  caused by: outer failure");
        assert_eq!(lines[2], "  caused by: connection reset by peer");
    }

    /// Verify an error without sources renders as itself.
    #[test]
    fn test_error_chain_single() {
        let error = ConfigError::Invalid {
            message: "bad".to_string(),
        };
        assert_eq!(error_chain(&error), "Invalid configuration: bad");
    }
}

mod exit_code_tests {
    use super::*;

    /// Verify the documented exit codes.
    #[test]
    fn test_exit_codes() {
        let bind = ServiceError::BindFailed {
            address: "0.0.0.0:80".to_string(),
            message: "permission denied".to_string(),
        };
        assert_eq!(bind.exit_code(), 1);

        let server = ServiceError::ServerFailed {
            message: "boom".to_string(),
        };
        assert_eq!(server.exit_code(), 2);

        let config = ServiceError::from(ConfigError::Missing {
            key: "github.webhook_secret".to_string(),
        });
        assert_eq!(config.exit_code(), 3);

        let credentials = ServiceError::from(AuthError::InvalidPrivateKey {
            message: "bad pem".to_string(),
        });
        assert_eq!(credentials.exit_code(), 3);
    }
}
