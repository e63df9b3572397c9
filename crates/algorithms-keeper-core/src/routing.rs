//! Event routing and dispatch.
//!
//! An [`EventRouter`] maps an event type, optionally narrowed to a single
//! payload `action`, to an ordered list of [`EventHandler`]s. Routers compose
//! with [`EventRouter::merge`]; the merged router invokes every handler of the
//! left router before any handler of the right one.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use algorithms_keeper_core::cache::TokenCache;
//! use algorithms_keeper_core::client::GitHubApi;
//! use algorithms_keeper_core::error::HandlerError;
//! use algorithms_keeper_core::event::Event;
//! use algorithms_keeper_core::routing::{EventHandler, EventRouter};
//! use async_trait::async_trait;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl EventHandler for Greeter {
//!     async fn handle(
//!         &self,
//!         event: &Event,
//!         _api: &GitHubApi,
//!         _tokens: &TokenCache,
//!     ) -> Result<(), HandlerError> {
//!         println!("new pull request in delivery {}", event.delivery_id());
//!         Ok(())
//!     }
//! }
//!
//! let mut router = EventRouter::new();
//! router.register("pull_request", Some("opened"), Arc::new(Greeter));
//!
//! # tokio_test::block_on(async {
//! use algorithms_keeper_core::client::{ClientConfig, ReqwestTransport};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
//! let api = GitHubApi::new(Arc::new(transport), ClientConfig::default());
//! let event = Event::new("pull_request", "d-1", json!({"action": "opened"}));
//!
//! router.dispatch(&event, &api, &TokenCache::default()).await.unwrap();
//! # });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::TokenCache;
use crate::client::GitHubApi;
use crate::error::HandlerError;
use crate::event::Event;

/// Reaction logic for one kind of event.
///
/// Handlers run sequentially within a delivery. A failure aborts the
/// delivery; handlers that already ran are not rolled back, so handlers
/// should tolerate redelivery of the same event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &Event,
        api: &GitHubApi,
        tokens: &TokenCache,
    ) -> Result<(), HandlerError>;
}

#[derive(Clone)]
struct Route {
    action: Option<String>,
    handler: Arc<dyn EventHandler>,
}

impl Route {
    fn accepts(&self, action: Option<&str>) -> bool {
        match &self.action {
            None => true,
            Some(filter) => action == Some(filter.as_str()),
        }
    }
}

/// Routing table from event type to ordered handlers.
#[derive(Clone, Default)]
pub struct EventRouter {
    routes: HashMap<String, Vec<Route>>,
}

impl EventRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`.
    ///
    /// With `action` set, the handler only sees payloads whose `action`
    /// field equals it; otherwise it sees every payload of the type.
    pub fn register(
        &mut self,
        event_type: impl Into<String>,
        action: Option<&str>,
        handler: Arc<dyn EventHandler>,
    ) -> &mut Self {
        self.routes
            .entry(event_type.into())
            .or_default()
            .push(Route {
                action: action.map(str::to_string),
                handler,
            });
        self
    }

    /// Combine with `other`, appending its handlers after this router's.
    pub fn merge(mut self, other: EventRouter) -> Self {
        for (event_type, routes) in other.routes {
            self.routes.entry(event_type).or_default().extend(routes);
        }
        self
    }

    /// Handlers that apply to `event`, in invocation order.
    pub fn matching(&self, event: &Event) -> Vec<Arc<dyn EventHandler>> {
        self.routes
            .get(event.event_type())
            .map(|routes| {
                routes
                    .iter()
                    .filter(|route| route.accepts(event.action()))
                    .map(|route| Arc::clone(&route.handler))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of handlers registered for `event_type`, ignoring actions.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.routes.get(event_type).map_or(0, Vec::len)
    }

    /// Check if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.values().all(Vec::is_empty)
    }

    /// Run every matching handler in order.
    ///
    /// Stops at, and returns, the first handler failure. An event with no
    /// matching handlers succeeds without doing anything.
    pub async fn dispatch(
        &self,
        event: &Event,
        api: &GitHubApi,
        tokens: &TokenCache,
    ) -> Result<(), HandlerError> {
        let handlers = self.matching(event);
        debug!(
            event_type = %event.event_type(),
            action = event.action().unwrap_or(""),
            handlers = handlers.len(),
            "Dispatching event"
        );

        for handler in handlers {
            handler.handle(event, api, tokens).await?;
        }

        Ok(())
    }
}

impl FromIterator<EventRouter> for EventRouter {
    fn from_iter<I: IntoIterator<Item = EventRouter>>(iter: I) -> Self {
        iter.into_iter().fold(EventRouter::new(), EventRouter::merge)
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .routes
            .iter()
            .map(|(event_type, routes)| (event_type.as_str(), routes.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventRouter").field("routes", &counts).finish()
    }
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
