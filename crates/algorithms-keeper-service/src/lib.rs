//! # algorithms-keeper service
//!
//! HTTP entry point receiving GitHub webhook deliveries.
//!
//! A delivery moves through a fixed sequence:
//! 1. the signature and payload are checked; failure answers `500`
//! 2. `ping` events answer `200` immediately
//! 3. otherwise a request-scoped API client is built, the consistency delay
//!    elapses and every matching handler runs in order
//! 4. a rate limit summary is logged and the delivery answers `200`
//!
//! Any failure after step 1 also answers `500`; GitHub is left to redeliver.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use algorithms_keeper_core::cache::Caches;
use algorithms_keeper_core::client::{GitHubApi, LoggingTransport, ReqwestTransport, Transport};
use algorithms_keeper_core::event::Event;
use algorithms_keeper_core::routing::EventRouter;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use bytes::Bytes;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument};

pub use config::ServiceConfig;
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};

/// Format of the rate limit reset time in delivery summaries.
pub const RESET_TIME_FORMAT: &str = "%b-%d-%Y %H:%M:%S %Z";

/// Application state shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub router: Arc<EventRouter>,
    pub caches: Caches,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    /// Create state over an existing transport, with caches sized by
    /// `config`.
    pub fn new(config: ServiceConfig, router: EventRouter, transport: Arc<dyn Transport>) -> Self {
        let caches = Caches::new(&config.cache.cache_config());
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            caches,
            transport,
        }
    }

    /// Create state with the production logging transport.
    pub fn from_config(config: ServiceConfig, router: EventRouter) -> Result<Self, ServiceError> {
        let client = ReqwestTransport::new(config.github.client_config().timeout)?;
        let transport = LoggingTransport::new(client).with_color(config.logging.colorize());
        Ok(Self::new(config, router, Arc::new(transport)))
    }

    /// Build the API client for one delivery.
    ///
    /// The client shares the process-wide connection pool and response
    /// cache; its rate limit snapshot belongs to this delivery alone.
    pub fn api(&self) -> GitHubApi {
        GitHubApi::new(
            Arc::clone(&self.transport),
            self.config.github.client_config(),
        )
        .with_cache(self.caches.responses.clone())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("caches", &self.caches)
            .finish()
    }
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_webhook))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Handle one webhook delivery.
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    let event = Event::from_http(&headers, &body, &state.config.github.webhook_secret)?;

    info!(
        event_type = %event.event_type(),
        action = event.action().unwrap_or(""),
        delivery_id = %event.delivery_id(),
        "Received webhook event"
    );

    if event.is_ping() {
        info!(delivery_id = %event.delivery_id(), "Answered ping");
        return Ok(StatusCode::OK);
    }

    let api = state.api();

    tokio::time::sleep(state.config.server.consistency_delay()).await;

    state
        .router
        .dispatch(&event, &api, &state.caches.tokens)
        .await
        .map_err(WebhookHandlerError::HandlerFailed)?;

    log_delivery_summary(&api, &event);

    Ok(StatusCode::OK)
}

/// Log the remaining quota after a delivery, when GitHub reported one.
fn log_delivery_summary(api: &GitHubApi, event: &Event) {
    match api.rate_limit() {
        Some(limit) => info!(
            rate_limit_remaining = limit.remaining(),
            rate_limit_limit = limit.limit(),
            rate_limit_reset = %limit.reset_at().format(RESET_TIME_FORMAT),
            delivery_id = %event.delivery_id(),
            "Delivery processed"
        ),
        None => debug!(
            delivery_id = %event.delivery_id(),
            "Delivery processed; no rate limit information available"
        ),
    }
}

/// Start the HTTP server
pub async fn start_server(config: ServiceConfig, router: EventRouter) -> Result<(), ServiceError> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let shutdown_timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_seconds);

    let state = AppState::from_config(config, router)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e: std::net::AddrParseError| ServiceError::BindFailed {
            address: format!("{}:{}", host, port),
            message: e.to_string(),
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // In-flight deliveries get `shutdown_timeout` to finish once a signal
    // arrives.
    tokio::select! {
        result = serve => result.map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?,
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            info!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; abandoning in-flight requests"
            );
        }
    }

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
