//! GitHub REST API client used by event handlers.
//!
//! [`GitHubApi`] is a cheap, cloneable handle over a shared [`Transport`] and
//! [`ResponseCache`]. The service builds one per webhook delivery; handlers
//! derive authorised copies with [`GitHubApi::authorized`].
//!
//! GET requests are conditional whenever a cached validator exists for the
//! same URL and credential. A `304 Not Modified` answer is served from the
//! cache without a body transfer.

mod logging;
mod pagination;
mod rate_limit;
mod transport;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE,
    IF_NONE_MATCH, LAST_MODIFIED, LINK, USER_AGENT,
};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::cache::{CachedResponse, ResponseCache};
use crate::error::ApiError;

pub use logging::{ApiLogLine, LoggingTransport, StatusClass};
pub use pagination::{parse_link_header, Links};
pub use rate_limit::{parse_rate_limit_from_headers, RateLimit};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

/// Media type requested on every call.
pub const ACCEPT_HEADER_VALUE: &str = "application/vnd.github.v3+json";

/// Default GitHub API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default `User-Agent` identifying the requester.
pub const DEFAULT_REQUESTER: &str = "TheAlgorithms/Python";

/// Static client settings.
///
/// # Examples
///
/// ```
/// use algorithms_keeper_core::client::ClientConfig;
///
/// let config = ClientConfig::default().with_api_url("https://github.example.com/api/v3");
/// assert_eq!(config.requester, "TheAlgorithms/Python");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL relative paths are resolved against.
    pub api_url: String,

    /// `User-Agent` header value.
    pub requester: String,

    /// Timeout applied by the default transport.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            requester: DEFAULT_REQUESTER.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Set the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the requester sent as `User-Agent`.
    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = requester.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Credential attached to outgoing requests.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Authorization {
    /// No `Authorization` header.
    #[default]
    Anonymous,

    /// Installation or personal access token, sent as `token <value>`.
    Token(String),

    /// GitHub App JWT, sent as `bearer <value>`.
    Jwt(String),
}

impl Authorization {
    fn header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Token(token) => Some(format!("token {}", token)),
            Self::Jwt(jwt) => Some(format!("bearer {}", jwt)),
        }
    }

    // Cache keys must separate credentials without embedding them.
    fn fingerprint(&self) -> String {
        match self.header_value() {
            None => "anonymous".to_string(),
            Some(value) => hex::encode(&Sha256::digest(value.as_bytes())[..8]),
        }
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Token(_) => f.debug_tuple("Token").field(&"<REDACTED>").finish(),
            Self::Jwt(_) => f.debug_tuple("Jwt").field(&"<REDACTED>").finish(),
        }
    }
}

/// Request-scoped GitHub API handle.
///
/// Clones share the transport, response cache and rate limit snapshot.
#[derive(Clone)]
pub struct GitHubApi {
    transport: Arc<dyn Transport>,
    cache: Option<ResponseCache>,
    config: Arc<ClientConfig>,
    authorization: Authorization,
    rate_limit: Arc<Mutex<Option<RateLimit>>>,
}

impl GitHubApi {
    /// Create an anonymous client with no response cache.
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            cache: None,
            config: Arc::new(config),
            authorization: Authorization::Anonymous,
            rate_limit: Arc::new(Mutex::new(None)),
        }
    }

    /// Enable conditional GET caching through `cache`.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Derive a handle that sends `authorization` on every request.
    ///
    /// The returned handle shares this handle's rate limit snapshot.
    pub fn authorized(&self, authorization: Authorization) -> Self {
        Self {
            authorization,
            ..self.clone()
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Rate limit reported by the most recent response, if any.
    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// GET a single resource.
    pub async fn getitem(&self, url: &str) -> Result<Value, ApiError> {
        let (value, _) = self.execute(Method::GET, url, None).await?;
        Ok(value)
    }

    /// GET every item of a paginated collection, following `rel="next"`
    /// links until exhausted.
    ///
    /// Pages may be arrays or search-style objects carrying an `items` array.
    pub async fn getiter(&self, url: &str) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next.take() {
            let (page, links) = self.execute(Method::GET, &page_url, None).await?;
            match page {
                Value::Array(values) => items.extend(values),
                Value::Object(mut object) => {
                    if let Some(Value::Array(values)) = object.remove("items") {
                        items.extend(values);
                    }
                }
                _ => {}
            }
            next = links.next;
        }

        Ok(items)
    }

    /// POST a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Value, ApiError> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        let (value, _) = self.execute(Method::POST, url, Some(body)).await?;
        Ok(value)
    }

    /// PATCH a JSON body.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        let (value, _) = self.execute(Method::PATCH, url, Some(body)).await?;
        Ok(value)
    }

    /// PUT, optionally with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()?
            .map(Bytes::from);
        let (value, _) = self.execute(Method::PUT, url, body).await?;
        Ok(value)
    }

    /// DELETE a resource.
    pub async fn delete(&self, url: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// Resolve `url` against the configured base URL.
    ///
    /// Absolute URLs are used as given. Relative paths are appended to the
    /// base, preserving any path prefix it carries.
    pub fn format_url(&self, url: &str) -> Result<Url, ApiError> {
        let invalid = |e: url::ParseError, url: &str| ApiError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        };

        if url.starts_with("http://") || url.starts_with("https://") {
            return Url::parse(url).map_err(|e| invalid(e, url));
        }

        let joined = format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| invalid(e, &joined))
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<(Value, Links), ApiError> {
        let url = self.format_url(url)?;
        let mut request = ApiRequest::new(method.clone(), url);
        request.headers = self.base_headers();

        if let Some(body) = body {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.body = body;
        }

        let cache_key = match (&self.cache, method == Method::GET) {
            (Some(_), true) => Some(self.cache_key(&method, &request.url)),
            _ => None,
        };

        let cached = match (&self.cache, &cache_key) {
            (Some(cache), Some(key)) => cache.get(key),
            _ => None,
        };

        if let Some(cached) = &cached {
            add_validators(&mut request.headers, cached);
        }

        let response = self.transport.send(request).await?;
        self.record_rate_limit(&response.headers);

        let status = response.status;

        if status == StatusCode::NOT_MODIFIED {
            let cached = cached.ok_or(ApiError::NotModified)?;
            debug!(url = %response.url, "Serving cached response");
            let links = parse_link_header(cached.link.as_deref());
            return Ok((decode_body(&cached.body)?, links));
        }

        if status.is_success() {
            if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
                let entry = CachedResponse {
                    etag: header_string(&response.headers, ETAG.as_str()),
                    last_modified: header_string(&response.headers, LAST_MODIFIED.as_str()),
                    link: header_string(&response.headers, LINK.as_str()),
                    body: response.body.clone(),
                };
                if entry.has_validator() {
                    cache.insert(key, entry);
                }
            }

            let links = parse_link_header(response.headers.get(LINK).and_then(|v| v.to_str().ok()));
            return Ok((decode_body(&response.body)?, links));
        }

        Err(self.status_error(&response))
    }

    fn base_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER_VALUE));
        if let Ok(value) = HeaderValue::from_str(&self.config.requester) {
            headers.insert(USER_AGENT, value);
        }
        if let Some(value) = self
            .authorization
            .header_value()
            .and_then(|v| HeaderValue::from_str(&v).ok())
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    fn cache_key(&self, method: &Method, url: &Url) -> String {
        format!("{} {} {}", method, url, self.authorization.fingerprint())
    }

    fn record_rate_limit(&self, headers: &HeaderMap) {
        if let Some(limit) = parse_rate_limit_from_headers(headers) {
            *self.rate_limit.lock().unwrap_or_else(PoisonError::into_inner) = Some(limit);
        }
    }

    fn status_error(&self, response: &ApiResponse) -> ApiError {
        let status = response.status;

        if status.is_redirection() {
            return ApiError::Redirection {
                status: status.as_u16(),
            };
        }

        if status == StatusCode::FORBIDDEN {
            if let Some(limit) = parse_rate_limit_from_headers(&response.headers) {
                if limit.is_exhausted() {
                    return ApiError::RateLimitExceeded {
                        reset_at: limit.reset_at(),
                    };
                }
            }
        }

        let message = error_message(response);

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            ApiError::Validation { message }
        } else if status.is_server_error() {
            ApiError::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            ApiError::BadRequest {
                status: status.as_u16(),
                message,
            }
        }
    }
}

impl std::fmt::Debug for GitHubApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubApi")
            .field("config", &self.config)
            .field("authorization", &self.authorization)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

fn add_validators(headers: &mut HeaderMap, cached: &CachedResponse) {
    if let Some(value) = cached.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(IF_NONE_MATCH, value);
    }
    if let Some(value) = cached
        .last_modified
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
    {
        headers.insert(IF_MODIFIED_SINCE, value);
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn decode_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    match serde_json::from_slice(body) {
        Ok(value) => Ok(value),
        Err(_) if std::str::from_utf8(body).is_ok() => {
            Ok(Value::String(String::from_utf8_lossy(body).into_owned()))
        }
        Err(e) => Err(e.into()),
    }
}

fn error_message(response: &ApiResponse) -> String {
    serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            response
                .status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
