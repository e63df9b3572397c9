//! Common test utilities for algorithms-keeper integration tests
//!
//! This module provides:
//! - Recording implementations of the handler and transport seams
//! - Builders for signed webhook requests
//! - Service state fixtures

use algorithms_keeper_core::auth::{AppCredentials, GitHubAppId};
use algorithms_keeper_core::cache::TokenCache;
use algorithms_keeper_core::client::{ApiRequest, ApiResponse, GitHubApi, Transport};
use algorithms_keeper_core::error::{ApiError, HandlerError};
use algorithms_keeper_core::event::{sign_sha256, Event, DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_256_HEADER};
use algorithms_keeper_core::routing::{EventHandler, EventRouter};
use algorithms_keeper_service::{AppState, ServiceConfig};
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode, Version};
use bytes::Bytes;
use std::sync::{Arc, Mutex};

/// Shared secret used to sign every test delivery.
pub const WEBHOOK_SECRET: &str = "integration-secret";

/// Private key of the test GitHub App.
#[allow(dead_code)]
pub const TEST_PRIVATE_KEY_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../algorithms-keeper-core/testdata/app_private_key.pem"
));

// ============================================================================
// Recording handler
// ============================================================================

/// Handler that records the deliveries it sees under a label.
#[derive(Clone)]
#[allow(dead_code)]
pub struct RecordingHandler {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label,
            log,
            fail: false,
        }
    }

    pub fn failing(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label,
            log,
            fail: true,
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(
        &self,
        event: &Event,
        _api: &GitHubApi,
        _tokens: &TokenCache,
    ) -> Result<(), HandlerError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.label, event.delivery_id()));
        if self.fail {
            return Err(format!("{} failed", self.label).into());
        }
        Ok(())
    }
}

// ============================================================================
// Recording transport
// ============================================================================

/// Transport that records outbound requests and answers `200 {}`.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", request.method, request.url));
        Ok(ApiResponse {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            url: request.url,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Service configuration with the test secret and no consistency delay.
#[allow(dead_code)]
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.github.webhook_secret = WEBHOOK_SECRET.to_string();
    config.server.consistency_delay_ms = 0;
    config
}

/// Service state over a recording transport.
#[allow(dead_code)]
pub fn create_test_app_state(router: EventRouter) -> (AppState, RecordingTransport) {
    let transport = RecordingTransport::default();
    let state = AppState::new(test_config(), router, Arc::new(transport.clone()));
    (state, transport)
}

/// Credentials of the test GitHub App.
#[allow(dead_code)]
pub fn test_credentials() -> AppCredentials {
    AppCredentials::from_pem(GitHubAppId::new(31337), TEST_PRIVATE_KEY_PEM).unwrap()
}

/// A JSON delivery signed with the test secret.
#[allow(dead_code)]
pub fn signed_request(event_type: &str, delivery_id: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(EVENT_HEADER, event_type)
        .header(DELIVERY_HEADER, delivery_id)
        .header(CONTENT_TYPE, "application/json")
        .header(
            SIGNATURE_256_HEADER,
            sign_sha256(body.as_bytes(), WEBHOOK_SECRET),
        )
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A form-encoded delivery signed with the test secret.
#[allow(dead_code)]
pub fn signed_form_request(event_type: &str, delivery_id: &str, payload: &str) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", payload)
        .finish();
    Request::builder()
        .method("POST")
        .uri("/")
        .header(EVENT_HEADER, event_type)
        .header(DELIVERY_HEADER, delivery_id)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(
            SIGNATURE_256_HEADER,
            sign_sha256(body.as_bytes(), WEBHOOK_SECRET),
        )
        .body(Body::from(body))
        .unwrap()
}

