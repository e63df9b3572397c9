//! Tests for the built-in installation handlers.

use super::*;
use algorithms_keeper_core::auth::GitHubAppId;
use algorithms_keeper_core::client::{ClientConfig, ReqwestTransport};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_PRIVATE_KEY_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../algorithms-keeper-core/testdata/app_private_key.pem"
));

fn credentials() -> AppCredentials {
    AppCredentials::from_pem(GitHubAppId::new(77), TEST_PRIVATE_KEY_PEM).unwrap()
}

fn api(server: &MockServer) -> GitHubApi {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    GitHubApi::new(
        Arc::new(transport),
        ClientConfig::default().with_api_url(server.uri()),
    )
}

async fn token_endpoint(installation: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/app/installations/{}/access_tokens", installation)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_installation",
            "expires_at": "2099-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    server
}

mod repository_names_tests {
    use super::*;

    /// Verify names are read from both payload shapes.
    #[test]
    fn test_repository_names() {
        let created = json!({
            "repositories": [{"full_name": "o/a"}, {"full_name": "o/b"}]
        });
        assert_eq!(repository_names(&created), vec!["o/a", "o/b"]);

        let added = json!({
            "repositories_added": [{"full_name": "o/c"}],
            "repositories_removed": [{"full_name": "o/d"}]
        });
        assert_eq!(repository_names(&added), vec!["o/c"]);

        assert!(repository_names(&json!({})).is_empty());
    }
}

mod handler_tests {
    use super::*;

    /// Verify a new installation primes the token cache.
    #[tokio::test]
    async fn test_installation_created_caches_token() {
        let server = token_endpoint(1234).await;
        let tokens = TokenCache::default();
        let event = Event::new(
            INSTALLATION_EVENT,
            "d-1",
            json!({
                "action": "created",
                "installation": {"id": 1234},
                "repositories": [{"full_name": "TheAlgorithms/Python"}]
            }),
        );

        let router = installation_router(credentials());
        router.dispatch(&event, &api(&server), &tokens).await.unwrap();

        let token = tokens.get(InstallationId::new(1234)).expect("token cached");
        assert_eq!(token.token(), "ghs_installation");
    }

    /// Verify added repositories trigger the same handler.
    #[tokio::test]
    async fn test_repositories_added() {
        let server = token_endpoint(55).await;
        let tokens = TokenCache::default();
        let event = Event::new(
            INSTALLATION_REPOSITORIES_EVENT,
            "d-2",
            json!({
                "action": "added",
                "installation": {"id": 55},
                "repositories_added": [{"full_name": "o/r"}]
            }),
        );

        installation_router(credentials())
            .dispatch(&event, &api(&server), &tokens)
            .await
            .unwrap();

        assert!(tokens.get(InstallationId::new(55)).is_some());
    }

    /// Verify other installation actions are ignored.
    #[test]
    fn test_other_actions_not_routed() {
        let router = installation_router(credentials());

        let deleted = Event::new(INSTALLATION_EVENT, "d", json!({"action": "deleted"}));
        assert!(router.matching(&deleted).is_empty());

        let removed = Event::new(
            INSTALLATION_REPOSITORIES_EVENT,
            "d",
            json!({"action": "removed"}),
        );
        assert!(router.matching(&removed).is_empty());
    }

    /// Verify a payload without an installation fails the delivery.
    #[tokio::test]
    async fn test_missing_installation_id_fails() {
        let server = MockServer::start().await;
        let event = Event::new(INSTALLATION_EVENT, "d", json!({"action": "created"}));

        let result = installation_router(credentials())
            .dispatch(&event, &api(&server), &TokenCache::default())
            .await;

        let error = result.expect_err("installation id is required");
        assert!(error.to_string().contains("installation.id"));
    }

    /// Verify no handlers are registered without App credentials.
    #[test]
    fn test_default_router_without_credentials() {
        assert!(default_router(None).is_empty());
        assert_eq!(
            default_router(Some(credentials())).handler_count(INSTALLATION_EVENT),
            1
        );
    }
}
