//! Raw HTTP exchange with the GitHub REST API.
//!
//! Every API call goes through an [`HttpTransport`]. Responses are fully
//! buffered so they can be inspected for rate-limit signals and then decoded
//! by the caller.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Method, StatusCode};
use thiserror::Error;

/// User agent sent with every API request.
const USER_AGENT: &str = concat!("git-fleet/", env!("CARGO_PKG_VERSION"));

/// GitHub REST API version header value.
const API_VERSION: &str = "2022-11-28";

/// Errors raised before a response is received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client failed to send the request or read the response.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request could not be built.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// An outbound API request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }

    /// Returns true for verbs that create, update, replace or delete resources.
    pub fn is_write(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PATCH | Method::PUT | Method::DELETE
        )
    }
}

/// A buffered API response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header, ignoring names or values that are not valid HTTP.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = body.to_string().into_bytes();
        self
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Sends API requests and returns buffered responses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request. Non-success statuses are returned as responses, not errors.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    token: String,
}

impl ReqwestTransport {
    /// Creates a transport authenticating with the given token.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
