//! Rate limit snapshots taken from GitHub response headers.
//!
//! GitHub reports the caller's quota on every response:
//! - `X-RateLimit-Limit`: maximum requests per window
//! - `X-RateLimit-Remaining`: requests left in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `X-RateLimit-Resource`: which quota the request counted against

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";
const RESOURCE_HEADER: &str = "x-ratelimit-resource";

/// Quota state reported by the most recent response.
///
/// # Examples
///
/// ```
/// use algorithms_keeper_core::client::RateLimit;
/// use chrono::{Duration, Utc};
///
/// let rate_limit = RateLimit::new(5000, 4500, Utc::now() + Duration::hours(1), "core");
///
/// assert!(!rate_limit.is_exhausted());
/// assert_eq!(rate_limit.remaining(), 4500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    limit: u32,
    remaining: u32,
    reset_at: DateTime<Utc>,
    resource: String,
}

impl RateLimit {
    /// Create a snapshot.
    pub fn new(
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            limit,
            remaining,
            reset_at,
            resource: resource.into(),
        }
    }

    /// Maximum requests allowed in the window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Requests left in the window.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// When the window resets.
    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }

    /// Quota the snapshot describes, e.g. `core` or `search`.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Check if no requests remain.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Parse a [`RateLimit`] from response headers.
///
/// Returns `None` unless limit, remaining and reset are all present and
/// numeric. The resource defaults to `core`.
pub fn parse_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimit> {
    let limit = header_number::<u32>(headers, LIMIT_HEADER)?;
    let remaining = header_number::<u32>(headers, REMAINING_HEADER)?;
    let reset = header_number::<i64>(headers, RESET_HEADER)?;
    let reset_at = Utc.timestamp_opt(reset, 0).single()?;

    let resource = headers
        .get(RESOURCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("core");

    Some(RateLimit::new(limit, remaining, reset_at, resource))
}

fn header_number<N: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<N> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
