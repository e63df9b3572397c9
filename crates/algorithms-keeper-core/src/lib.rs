//! # algorithms-keeper core
//!
//! Webhook intake and GitHub API plumbing for the algorithms-keeper bot.
//!
//! This crate provides:
//! - Signed webhook parsing into [`Event`]s
//! - An [`EventRouter`] that maps event types and actions to handlers and
//!   dispatches them in registration order
//! - The process-wide response and installation token caches
//! - [`GitHubApi`], a logging, conditionally-caching REST client
//! - GitHub App JWTs and installation token exchange
//!
//! # Examples
//!
//! ```rust
//! use algorithms_keeper_core::event::{sign_sha256, validate_signature};
//!
//! let body = br#"{"zen":"Design for failure."}"#;
//! let signature = sign_sha256(body, "secret");
//!
//! assert!(validate_signature(body, &signature, "secret").is_ok());
//! assert!(validate_signature(body, &signature, "wrong").is_err());
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod event;
pub mod routing;

pub use auth::{AppCredentials, GitHubAppId, InstallationId, InstallationToken};
pub use cache::{CacheConfig, Caches, ResponseCache, TokenCache};
pub use client::{Authorization, ClientConfig, GitHubApi, LoggingTransport, ReqwestTransport};
pub use error::{ApiError, AuthError, EventError, HandlerError};
pub use event::Event;
pub use routing::{EventHandler, EventRouter};
