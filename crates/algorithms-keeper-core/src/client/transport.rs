//! The primitive "send one request to GitHub" operation.
//!
//! [`GitHubApi`](super::GitHubApi) never talks to the network directly; it
//! hands fully-formed [`ApiRequest`]s to a [`Transport`]. This is the seam
//! where [`LoggingTransport`](super::LoggingTransport) decorates the call and
//! where tests substitute canned responses.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Version};
use url::Url;

use crate::error::ApiError;

/// An outbound request, fully resolved.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// GitHub's answer to an [`ApiRequest`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,

    /// Protocol version the response arrived over.
    pub version: Version,

    /// Final URL of the response, after any redirects.
    pub url: Url,

    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Sends a single request and returns the raw response.
///
/// Implementations must not interpret the status code; a 4xx or 5xx response
/// is still `Ok`. Errors are reserved for failures to obtain a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// One instance is shared by every request the service handles.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let version = response.version();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ApiResponse {
            status,
            version,
            url,
            headers,
            body,
        })
    }
}
