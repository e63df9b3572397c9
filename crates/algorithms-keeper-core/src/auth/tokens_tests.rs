//! Tests for installation token exchange.

use super::*;
use crate::client::{ClientConfig, ReqwestTransport};
use crate::error::ApiError;
use crate::GitHubAppId;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_PRIVATE_KEY_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/testdata/app_private_key.pem"
));

fn api(server: &MockServer) -> GitHubApi {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    GitHubApi::new(
        Arc::new(transport),
        ClientConfig::default().with_api_url(server.uri()),
    )
}

fn credentials() -> AppCredentials {
    AppCredentials::from_pem(GitHubAppId::new(99), TEST_PRIVATE_KEY_PEM).unwrap()
}

/// Verify a missing token is exchanged with the App JWT and then cached.
#[tokio::test]
async fn test_exchange_then_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/42/access_tokens"))
        .and(header_exists("authorization"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_fresh",
            "expires_at": "2099-01-01T00:00:00Z",
            "permissions": {"contents": "read"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    let tokens = TokenCache::default();
    let id = InstallationId::new(42);

    let first = installation_token(&api, &credentials(), id, &tokens)
        .await
        .expect("exchange should succeed");
    assert_eq!(first.token(), "ghs_fresh");
    assert_eq!(first.installation_id(), id);
    assert!(tokens.get(id).is_some());

    let second = installation_token(&api, &credentials(), id, &tokens)
        .await
        .expect("cached token should be returned");
    assert_eq!(second, first);
}

/// Verify the exchange authenticates with a bearer JWT.
#[tokio::test]
async fn test_exchange_uses_bearer_jwt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/1/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_x",
            "expires_at": "2099-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    installation_token(
        &api(&server),
        &credentials(),
        InstallationId::new(1),
        &TokenCache::default(),
    )
    .await
    .unwrap();

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(authorization.starts_with("bearer "));
    assert_eq!(authorization.matches('.').count(), 2);
}

/// Verify a rejected exchange surfaces as an API error and caches nothing.
#[tokio::test]
async fn test_rejected_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/5/access_tokens"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        )
        .mount(&server)
        .await;

    let tokens = TokenCache::default();
    let result = installation_token(
        &api(&server),
        &credentials(),
        InstallationId::new(5),
        &tokens,
    )
    .await;

    match result {
        Err(AuthError::Api(ApiError::BadRequest { status, message })) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("expected BadRequest, got {:?}", other),
    }
    assert!(tokens.get(InstallationId::new(5)).is_none());
}

/// Verify a malformed exchange response is a JSON error.
#[tokio::test]
async fn test_malformed_exchange_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/6/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"nope": true})))
        .mount(&server)
        .await;

    let result = installation_token(
        &api(&server),
        &credentials(),
        InstallationId::new(6),
        &TokenCache::default(),
    )
    .await;

    assert!(matches!(result, Err(AuthError::Api(ApiError::Json(_)))));
}
