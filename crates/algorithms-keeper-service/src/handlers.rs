//! Built-in event handlers.
//!
//! When the App is installed, or gains access to more repositories, an
//! installation access token is obtained straight away. That primes the
//! token cache for the handlers that follow and surfaces a broken App
//! configuration on the first delivery rather than the first real event.

use std::sync::Arc;

use algorithms_keeper_core::auth::{installation_token, AppCredentials, InstallationId};
use algorithms_keeper_core::cache::TokenCache;
use algorithms_keeper_core::client::GitHubApi;
use algorithms_keeper_core::error::HandlerError;
use algorithms_keeper_core::event::Event;
use algorithms_keeper_core::routing::{EventHandler, EventRouter};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Event type of App installation changes.
pub const INSTALLATION_EVENT: &str = "installation";

/// Event type of installation repository changes.
pub const INSTALLATION_REPOSITORIES_EVENT: &str = "installation_repositories";

/// Acquires an installation token and records the repositories it covers.
#[derive(Debug, Clone)]
pub struct InstallationHandler {
    credentials: Arc<AppCredentials>,
}

impl InstallationHandler {
    pub fn new(credentials: Arc<AppCredentials>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl EventHandler for InstallationHandler {
    async fn handle(
        &self,
        event: &Event,
        api: &GitHubApi,
        tokens: &TokenCache,
    ) -> Result<(), HandlerError> {
        let installation_id = event
            .installation_id()
            .map(InstallationId::new)
            .context("payload has no installation.id")?;

        let token = installation_token(api, &self.credentials, installation_id, tokens).await?;

        let repositories = repository_names(event.payload());
        for repository in &repositories {
            info!(
                installation_id = %installation_id,
                repository = %repository,
                "Installed on repository"
            );
        }

        info!(
            installation_id = %installation_id,
            repositories = repositories.len(),
            token_expires_at = %token.expires_at(),
            "Installation ready"
        );

        Ok(())
    }
}

/// Full names of the repositories an installation payload lists.
///
/// `installation` events carry `repositories`, `installation_repositories`
/// events carry `repositories_added`.
pub fn repository_names(payload: &Value) -> Vec<String> {
    ["repositories", "repositories_added"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(|repository| repository.get("full_name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Router for installation events.
pub fn installation_router(credentials: AppCredentials) -> EventRouter {
    let handler: Arc<dyn EventHandler> = Arc::new(InstallationHandler::new(Arc::new(credentials)));

    let mut router = EventRouter::new();
    router
        .register(INSTALLATION_EVENT, Some("created"), Arc::clone(&handler))
        .register(INSTALLATION_REPOSITORIES_EVENT, Some("added"), handler);
    router
}

/// The production routing table.
///
/// Installation handlers are only registered when App credentials are
/// configured.
pub fn default_router(credentials: Option<AppCredentials>) -> EventRouter {
    credentials.map(installation_router).unwrap_or_default()
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
