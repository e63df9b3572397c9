//! Process-wide caches shared by every request.
//!
//! Two independent bounded caches are created once at startup and handed to
//! each request by reference:
//!
//! - [`ResponseCache`] holds conditional-request validators (`ETag`,
//!   `Last-Modified`) and the body they validate, evicting the least recently
//!   used entry when full.
//! - [`TokenCache`] holds installation access tokens; every entry expires a
//!   fixed duration after insertion regardless of how often it is read.
//!
//! Both are backed by `moka` caches, which are safe for concurrent access.
//! moka batches recency updates and evictions; the response cache applies
//! them inside every hit and insert so LRU order is exact at each call.
//! Expired token entries are never returned and are dropped lazily.

use std::time::Duration;

use bytes::Bytes;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::debug;

use crate::auth::{InstallationId, InstallationToken};

/// Default number of entries in each cache.
pub const DEFAULT_CAPACITY: u64 = 500;

/// Default lifetime of a cached installation token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Sizing for the two shared caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached API responses.
    pub response_capacity: u64,

    /// Maximum number of cached installation tokens.
    pub token_capacity: u64,

    /// Lifetime of each cached installation token.
    pub token_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            response_capacity: DEFAULT_CAPACITY,
            token_capacity: DEFAULT_CAPACITY,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

/// A cached GET response and the validators that let GitHub confirm it is
/// still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// `ETag` header of the cached response.
    pub etag: Option<String>,

    /// `Last-Modified` header of the cached response.
    pub last_modified: Option<String>,

    /// `Link` header of the cached response, kept for pagination.
    pub link: Option<String>,

    /// Response body.
    pub body: Bytes,
}

impl CachedResponse {
    /// Check if the response carries at least one validator.
    pub fn has_validator(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

/// Least-recently-used cache of API responses.
///
/// Every hit counts as a use. Cloning yields a handle to the same cache.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, CachedResponse>,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` responses.
    pub fn new(capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { entries }
    }

    /// Look up a response, refreshing its recency on a hit.
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let hit = self.entries.get(key);
        if hit.is_some() {
            self.entries.run_pending_tasks();
        }
        hit
    }

    /// Store a response, evicting the least recently used entry when full.
    ///
    /// The eviction has happened by the time this returns.
    pub fn insert(&self, key: impl Into<String>, response: CachedResponse) {
        self.entries.insert(key.into(), response);
        self.entries.run_pending_tasks();
    }

    /// Remove a response.
    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(key);
    }

    /// Check if a response is cached without refreshing its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached responses.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

/// Time-bounded cache of installation access tokens keyed by installation.
#[derive(Clone)]
pub struct TokenCache {
    tokens: Cache<InstallationId, InstallationToken>,
    ttl: Duration,
}

impl TokenCache {
    /// Create a cache of at most `capacity` tokens, each living for `ttl`.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let tokens = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { tokens, ttl }
    }

    /// Look up the token for an installation.
    ///
    /// Returns `None` once the entry's TTL has elapsed, or when GitHub's own
    /// expiry for the token has passed.
    pub fn get(&self, installation_id: InstallationId) -> Option<InstallationToken> {
        let token = self.tokens.get(&installation_id)?;
        if token.is_expired() {
            debug!(installation_id = %installation_id, "Dropping expired installation token");
            self.tokens.invalidate(&installation_id);
            return None;
        }
        Some(token)
    }

    /// Store a token under its installation ID.
    pub fn insert(&self, token: InstallationToken) {
        self.tokens.insert(token.installation_id(), token);
    }

    /// Remove the token for an installation.
    pub fn invalidate(&self, installation_id: InstallationId) {
        self.tokens.invalidate(&installation_id);
    }

    /// Lifetime applied to every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Approximate number of cached tokens.
    pub fn entry_count(&self) -> u64 {
        self.tokens.entry_count()
    }

    /// Apply pending expiries and evictions immediately.
    pub fn run_pending_tasks(&self) {
        self.tokens.run_pending_tasks();
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TOKEN_TTL)
    }
}

// Security: tokens never appear in debug output
impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.tokens.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// The shared cache pair, built once per process.
#[derive(Debug, Clone, Default)]
pub struct Caches {
    /// Conditional-request cache used by the API client.
    pub responses: ResponseCache,

    /// Installation token cache passed to handlers.
    pub tokens: TokenCache,
}

impl Caches {
    /// Build both caches from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: ResponseCache::new(config.response_capacity),
            tokens: TokenCache::new(config.token_capacity, config.token_ttl),
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
