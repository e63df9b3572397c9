//! JWT generation for GitHub App authentication.
//!
//! GitHub requires RS256-signed JWTs with `iss` set to the App ID and an
//! expiry at most 10 minutes after issuance. The issue time is backdated by
//! 60 seconds to absorb clock drift between us and GitHub.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::GitHubAppId;
use crate::error::AuthError;

/// Maximum JWT lifetime GitHub accepts, in minutes.
pub const JWT_LIFETIME_MINUTES: i64 = 10;

const CLOCK_DRIFT_SECONDS: i64 = 60;

/// Claims carried by the App JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issued-at time (Unix seconds).
    pub iat: i64,

    /// Expiration time (Unix seconds).
    pub exp: i64,

    /// Issuer: the GitHub App ID.
    pub iss: String,
}

/// GitHub App identity able to sign JWTs.
#[derive(Clone)]
pub struct AppCredentials {
    app_id: GitHubAppId,
    encoding_key: EncodingKey,
}

impl AppCredentials {
    /// Create credentials from the App ID and its PEM-encoded RSA private key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPrivateKey`] if the PEM cannot be parsed.
    pub fn from_pem(app_id: GitHubAppId, pem: &str) -> Result<Self, AuthError> {
        let pem = pem.trim();
        if pem.is_empty() {
            return Err(AuthError::InvalidPrivateKey {
                message: "PEM string cannot be empty".to_string(),
            });
        }

        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::InvalidPrivateKey {
                message: format!("Failed to create encoding key: {}", e),
            })?;

        Ok(Self {
            app_id,
            encoding_key,
        })
    }

    /// The App ID these credentials sign for.
    pub fn app_id(&self) -> GitHubAppId {
        self.app_id
    }

    /// Build the claims for a JWT issued now.
    pub fn claims(&self) -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            iat: (now - Duration::seconds(CLOCK_DRIFT_SECONDS)).timestamp(),
            exp: (now + Duration::minutes(JWT_LIFETIME_MINUTES)).timestamp(),
            iss: self.app_id.to_string(),
        }
    }

    /// Sign a fresh App JWT.
    pub fn jwt(&self) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::RS256), &self.claims(), &self.encoding_key).map_err(|e| {
            AuthError::JwtGenerationFailed {
                message: format!("Failed to encode JWT: {}", e),
            }
        })
    }
}

// Security: Don't expose key material in debug output
impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("encoding_key", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
