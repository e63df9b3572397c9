//! Installation token exchange.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::{AppCredentials, InstallationId, InstallationToken};
use crate::cache::TokenCache;
use crate::client::{Authorization, GitHubApi};
use crate::error::AuthError;

/// Final path segment of the token exchange endpoint.
///
/// Calls whose URL ends in this segment are never logged.
pub const TOKEN_ENDPOINT: &str = "access_tokens";

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Get an access token for `installation_id`.
///
/// Served from `tokens` while a cached entry is live. Otherwise a fresh App
/// JWT is exchanged at `POST /app/installations/{id}/access_tokens` and the
/// result is cached before being returned.
///
/// # Errors
///
/// Returns [`AuthError::JwtGenerationFailed`] if the JWT cannot be signed and
/// [`AuthError::Api`] if GitHub rejects the exchange.
pub async fn installation_token(
    api: &GitHubApi,
    credentials: &AppCredentials,
    installation_id: InstallationId,
    tokens: &TokenCache,
) -> Result<InstallationToken, AuthError> {
    if let Some(token) = tokens.get(installation_id) {
        debug!(installation_id = %installation_id, "Using cached installation token");
        return Ok(token);
    }

    let jwt = credentials.jwt()?;
    let url = format!("/app/installations/{}/{}", installation_id, TOKEN_ENDPOINT);

    let response = api
        .authorized(Authorization::Jwt(jwt))
        .post(&url, &serde_json::Map::new())
        .await?;

    let AccessTokenResponse { token, expires_at } =
        serde_json::from_value(response).map_err(crate::error::ApiError::from)?;

    let token = InstallationToken::new(token, installation_id, expires_at);
    tokens.insert(token.clone());

    info!(
        installation_id = %installation_id,
        expires_at = %expires_at,
        "Obtained installation token"
    );

    Ok(token)
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
