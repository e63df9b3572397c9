//! Request/response logging around the outbound transport.
//!
//! Every completed API call produces one log line of the form
//!
//! ```text
//! api "GET /repos/owner/repo/pulls?state=open NONE HTTPS/1.1" => 200:OK
//! ```
//!
//! Calls to the installation token endpoint are never logged because their
//! URL identifies the installation and their response carries a credential.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode, Version};
use tracing::{error, info};

use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::auth::TOKEN_ENDPOINT;
use crate::error::ApiError;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Outcome class of a response, selecting the log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx, or 304 answering a conditional request.
    Ok,
    /// Everything else.
    Error,
}

impl StatusClass {
    /// Classify a status code.
    pub fn of(status: StatusCode) -> Self {
        if status.is_success() || status == StatusCode::NOT_MODIFIED {
            Self::Ok
        } else {
            Self::Error
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Error => RED,
        }
    }
}

/// One formatted request/response log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiLogLine {
    pub class: StatusClass,
    pub method: String,
    /// Path and query string of the final URL.
    pub path: String,
    /// Request body as text, or `NONE`.
    pub data: String,
    /// Scheme and protocol version, e.g. `HTTPS/1.1`.
    pub version: String,
    /// `<code>:<reason phrase>`.
    pub status: String,
}

impl ApiLogLine {
    /// Build the record for a completed call.
    ///
    /// Returns `None` for calls to the token exchange endpoint.
    pub fn new(method: &Method, body: &Bytes, response: &ApiResponse) -> Option<Self> {
        if is_token_exchange(response) {
            return None;
        }

        let path = match response.url.query() {
            Some(query) => format!("{}?{}", response.url.path(), query),
            None => response.url.path().to_string(),
        };

        let data = if body.is_empty() {
            "NONE".to_string()
        } else {
            String::from_utf8_lossy(body).into_owned()
        };

        let version = format!(
            "{}/{}",
            response.url.scheme().to_ascii_uppercase(),
            protocol_version(response.version)
        );

        let status = format!(
            "{}:{}",
            response.status.as_u16(),
            response.status.canonical_reason().unwrap_or("")
        );

        Some(Self {
            class: StatusClass::of(response.status),
            method: method.to_string(),
            path,
            data,
            version,
            status,
        })
    }

    /// Render the line, optionally wrapping the status in ANSI colour.
    pub fn render(&self, colorize: bool) -> String {
        let status = if colorize {
            format!("{}{}{}", self.class.color(), self.status, RESET)
        } else {
            self.status.clone()
        };
        format!(
            "api \"{} {} {} {}\" => {}",
            self.method, self.path, self.data, self.version, status
        )
    }
}

fn is_token_exchange(response: &ApiResponse) -> bool {
    response
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|last| last == TOKEN_ENDPOINT)
}

fn protocol_version(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "0.9"
    } else if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2.0"
    } else if version == Version::HTTP_3 {
        "3.0"
    } else {
        "1.1"
    }
}

/// [`Transport`] decorator that logs every completed call.
///
/// Responses pass through untouched. Successful responses are logged at
/// `info`, all others at `error`.
#[derive(Debug, Clone)]
pub struct LoggingTransport<T> {
    inner: T,
    colorize: bool,
}

impl<T: Transport> LoggingTransport<T> {
    /// Wrap `inner`; log lines are rendered without colour.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            colorize: false,
        }
    }

    /// Enable or disable ANSI colouring of the status segment.
    pub fn with_color(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method.clone();
        let body = request.body.clone();

        let response = self.inner.send(request).await?;

        if let Some(line) = ApiLogLine::new(&method, &body, &response) {
            let message = line.render(self.colorize);
            match line.class {
                StatusClass::Ok => info!(
                    method = %line.method,
                    path = %line.path,
                    status = response.status.as_u16(),
                    "{}",
                    message
                ),
                StatusClass::Error => error!(
                    method = %line.method,
                    path = %line.path,
                    status = response.status.as_u16(),
                    "{}",
                    message
                ),
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
