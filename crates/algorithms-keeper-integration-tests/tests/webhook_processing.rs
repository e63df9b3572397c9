//! Integration tests for webhook processing
//!
//! These tests drive the full HTTP router: signature checking, ping
//! handling, ordered dispatch and error responses.

mod common;

use algorithms_keeper_core::routing::EventRouter;
use algorithms_keeper_service::create_router;
use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use common::{create_test_app_state, signed_form_request, signed_request, RecordingHandler};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

fn recording_router(log: &Arc<Mutex<Vec<String>>>) -> EventRouter {
    let mut router = EventRouter::new();
    router
        .register(
            "pull_request",
            Some("opened"),
            Arc::new(RecordingHandler::new("opened", Arc::clone(log))),
        )
        .register(
            "pull_request",
            None,
            Arc::new(RecordingHandler::new("any", Arc::clone(log))),
        );
    router
}

/// Verify a ping is acknowledged without running handlers or calling GitHub.
#[tokio::test]
async fn test_ping_is_acknowledged() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (state, transport) = create_test_app_state(recording_router(&log));
    let app = create_router(state);

    let response = app
        .oneshot(signed_request("ping", "ping-1", r#"{"zen":"Half measures are as bad as nothing at all.","hook_id":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(transport.request_count(), 0);
}

/// Verify handlers run in registration order, honouring action filters.
#[tokio::test]
async fn test_handlers_run_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (state, _) = create_test_app_state(recording_router(&log));
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(signed_request("pull_request", "d-1", r#"{"action":"opened","number":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(signed_request("pull_request", "d-2", r#"{"action":"closed","number":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        *log.lock().unwrap(),
        vec!["opened:d-1", "any:d-1", "any:d-2"]
    );
}

/// Verify form-encoded deliveries are accepted.
#[tokio::test]
async fn test_form_encoded_delivery() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (state, _) = create_test_app_state(recording_router(&log));
    let app = create_router(state);

    let response = app
        .oneshot(signed_form_request(
            "pull_request",
            "form-1",
            r#"{"action":"opened","title":"Add A* search & tests"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), vec!["opened:form-1", "any:form-1"]);
}

/// Verify a tampered body is rejected with an empty 500.
#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (state, _) = create_test_app_state(recording_router(&log));
    let app = create_router(state);

    let mut request = signed_request("pull_request", "d-3", r#"{"action":"opened"}"#);
    *request.body_mut() = Body::from(r#"{"action":"closed"}"#);

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
    assert!(log.lock().unwrap().is_empty());
}

/// Verify an unsupported content type is rejected.
#[tokio::test]
async fn test_unsupported_content_type() {
    let (state, _) = create_test_app_state(EventRouter::new());
    let app = create_router(state);

    let mut request = signed_request("push", "d-4", r#"{"ref":"main"}"#);
    request
        .headers_mut()
        .insert(CONTENT_TYPE, "text/plain".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

/// Verify a failing handler stops dispatch and fails the delivery.
#[tokio::test]
async fn test_failing_handler_stops_dispatch() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut router = EventRouter::new();
    router
        .register(
            "issues",
            None,
            Arc::new(RecordingHandler::failing("first", Arc::clone(&log))),
        )
        .register(
            "issues",
            None,
            Arc::new(RecordingHandler::new("second", Arc::clone(&log))),
        );
    let (state, _) = create_test_app_state(router);
    let app = create_router(state);

    let response = app
        .oneshot(signed_request("issues", "d-5", r#"{"action":"opened"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
    assert_eq!(*log.lock().unwrap(), vec!["first:d-5"]);
}

/// Verify only POST is routed.
#[tokio::test]
async fn test_get_is_not_allowed() {
    let (state, _) = create_test_app_state(EventRouter::new());
    let app = create_router(state);

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

/// Verify non-ping deliveries wait for the consistency delay.
#[tokio::test(start_paused = true)]
async fn test_consistency_delay_before_dispatch() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (mut state, _) = create_test_app_state(recording_router(&log));
    let mut config = (*state.config).clone();
    config.server.consistency_delay_ms = 1000;
    state.config = Arc::new(config);
    let app = create_router(state);

    let started = tokio::time::Instant::now();
    let response = app
        .oneshot(signed_request("pull_request", "d-6", r#"{"action":"closed"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(*log.lock().unwrap(), vec!["any:d-6"]);
}
