//! Configuration types for the HTTP service
//!
//! Sources are applied in order, later sources overriding earlier ones:
//!  1. built-in defaults
//!  2. `./config/service.yaml` (optional)
//!  3. the file named by `AK_CONFIG_FILE` (required when the variable is set)
//!  4. environment variables prefixed `AK__` with `__` separators,
//!     e.g. `AK__SERVER__PORT=9090` sets `server.port`
//!  5. the conventional deployment variables `GITHUB_SECRET`, `PORT`,
//!     `GITHUB_APP_ID` and `GITHUB_PRIVATE_KEY`

use std::time::Duration;

use algorithms_keeper_core::auth::{AppCredentials, GitHubAppId};
use algorithms_keeper_core::cache::CacheConfig;
use algorithms_keeper_core::client::{ClientConfig, DEFAULT_API_URL, DEFAULT_REQUESTER};
use algorithms_keeper_core::error::AuthError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ConfigError;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_FILE_ENV: &str = "AK_CONFIG_FILE";

/// Prefix of structured environment overrides.
pub const ENV_PREFIX: &str = "AK";

const DEFAULT_CONFIG_FILE: &str = "config/service";

// Deployment variables and the keys they set.
const PLATFORM_OVERRIDES: [(&str, &str); 4] = [
    ("GITHUB_SECRET", "github.webhook_secret"),
    ("PORT", "server.port"),
    ("GITHUB_APP_ID", "github.app_id"),
    ("GITHUB_PRIVATE_KEY", "github.private_key"),
];

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// GitHub App and API settings
    pub github: GitHubConfig,

    /// Shared cache sizing
    pub cache: CacheSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(
            config::File::with_name(DEFAULT_CONFIG_FILE)
                .required(false)
                .format(config::FileFormat::Yaml),
        );

        if let Ok(explicit_path) = std::env::var(CONFIG_FILE_ENV) {
            if !explicit_path.is_empty() {
                builder = builder.add_source(
                    config::File::with_name(&explicit_path)
                        .required(true)
                        .format(config::FileFormat::Yaml),
                );
                info!(path = %explicit_path, "Loading configuration from explicit path");
            }
        }

        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        for (variable, key) in PLATFORM_OVERRIDES {
            let value = std::env::var(variable).ok().filter(|v| !v.is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        let config: ServiceConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints the types cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.webhook_secret.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "github.webhook_secret".to_string(),
            });
        }

        if self.github.requester.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "github.requester cannot be empty".to_string(),
            });
        }

        if self.cache.response_capacity == 0 || self.cache.token_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "cache capacities must be greater than zero".to_string(),
            });
        }

        if self.cache.token_ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "cache.token_ttl_seconds must be greater than zero".to_string(),
            });
        }

        match (&self.github.app_id, &self.github.private_key) {
            (Some(_), None) => Err(ConfigError::Missing {
                key: "github.private_key".to_string(),
            }),
            (None, Some(_)) => Err(ConfigError::Missing {
                key: "github.app_id".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Pause before dispatching, giving GitHub's API time to reflect the
    /// event being delivered
    pub consistency_delay_ms: u64,
}

impl ServerConfig {
    /// Delay applied before dispatch.
    pub fn consistency_delay(&self) -> Duration {
        Duration::from_millis(self.consistency_delay_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            consistency_delay_ms: 1000,
        }
    }
}

/// GitHub configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Shared secret used to sign webhook deliveries
    pub webhook_secret: String,

    /// REST API base URL
    pub api_url: String,

    /// Requester identity, sent as the `User-Agent`
    pub requester: String,

    /// GitHub App ID
    pub app_id: Option<u64>,

    /// PEM-encoded App private key
    pub private_key: Option<String>,

    /// Outbound request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl GitHubConfig {
    /// Settings for the outbound API client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_api_url(self.api_url.clone())
            .with_requester(self.requester.clone())
            .with_timeout(Duration::from_secs(self.request_timeout_seconds))
    }

    /// App credentials, when the App is configured.
    ///
    /// Escaped `\n` sequences in the key are unescaped so the PEM can be
    /// supplied as a single-line environment variable.
    pub fn credentials(&self) -> Result<Option<AppCredentials>, AuthError> {
        match (self.app_id, self.private_key.as_deref()) {
            (Some(app_id), Some(pem)) => {
                let pem = pem.replace("\\n", "\n");
                AppCredentials::from_pem(GitHubAppId::new(app_id), &pem).map(Some)
            }
            _ => Ok(None),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            requester: DEFAULT_REQUESTER.to_string(),
            app_id: None,
            private_key: None,
            request_timeout_seconds: 30,
        }
    }
}

// Security: Don't expose secrets in debug output
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("webhook_secret", &"<REDACTED>")
            .field("api_url", &self.api_url)
            .field("requester", &self.requester)
            .field("app_id", &self.app_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<REDACTED>"))
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// Cache sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cached API responses
    pub response_capacity: u64,

    /// Maximum cached installation tokens
    pub token_capacity: u64,

    /// Installation token lifetime in seconds
    pub token_ttl_seconds: u64,
}

impl CacheSettings {
    /// Convert to the core cache configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            response_capacity: self.response_capacity,
            token_capacity: self.token_capacity,
            token_ttl: Duration::from_secs(self.token_ttl_seconds),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            response_capacity: defaults.response_capacity,
            token_capacity: defaults.token_capacity,
            token_ttl_seconds: defaults.token_ttl.as_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level used when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,

    /// Colour the status of API log lines
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Check if API log lines get ANSI colour codes.
    ///
    /// JSON output is never coloured.
    pub fn colorize(&self) -> bool {
        self.ansi && !self.json_format
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
