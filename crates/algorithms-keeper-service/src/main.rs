//! # algorithms-keeper
//!
//! Binary entry point for the webhook service.
//!
//! This executable:
//! - Loads configuration from files and the environment
//! - Initializes logging (warnings and errors on stderr)
//! - Builds the routing table
//! - Starts the HTTP server
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 invalid configuration.

use algorithms_keeper_service::config::LoggingConfig;
use algorithms_keeper_service::handlers::default_router;
use algorithms_keeper_service::logging::init_logging;
use algorithms_keeper_service::{start_server, ServiceConfig, ServiceError};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    init_logging(&config.logging);

    info!(
        host = %config.server.host,
        port = config.server.port,
        api_url = %config.github.api_url,
        "Starting algorithms-keeper"
    );

    let credentials = match config.github.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            let e = ServiceError::from(e);
            error!(error = %e, "Could not load GitHub App credentials; aborting");
            std::process::exit(e.exit_code());
        }
    };

    if credentials.is_none() {
        warn!("GitHub App credentials not configured; installation handlers are disabled");
    }

    let router = default_router(credentials);
    info!(router = ?router, "Routing table ready");

    if let Err(e) = start_server(config, router).await {
        error!("Failed to start server: {}", e);
        std::process::exit(e.exit_code());
    }
}

