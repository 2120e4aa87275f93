//! HTTP transport.
//!
//! [`Transport`] is the seam every state machine sends through. The
//! production implementation wraps a `reqwest` client with tracing; tests
//! substitute a scripted transport.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::TransportError;
use crate::request::{ApiRequest, ApiResponse, Method};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for VerseSync.
const USER_AGENT: &str = concat!("VerseSync/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends one request and returns whatever the server answered.
///
/// Implementations never retry and never interpret status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// `reqwest`-backed transport rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for `base_url` (e.g. `http://localhost:9000/v1`).
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot be
    /// built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;

        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a request path and query against the base URL.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let path = if request.path.starts_with('/') {
            request.path.clone()
        } else {
            format!("/{}", request.path)
        };
        let mut url = Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    fn map_send_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request)?;

        let mut builder = match request.method {
            Method::Get => self.inner.get(url),
            Method::Post => self.inner.post(url),
            Method::Patch => self.inner.patch(url),
            Method::Delete => self.inner.delete(url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!("Sending request");
        let response = builder.send().await.map_err(Self::map_send_error)?;
        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let text = response.text().await.map_err(Self::map_send_error)?;
        debug!(status, bytes = text.len(), "Response received");

        Ok(ApiResponse {
            status,
            body: parse_body(&text),
            retry_after_secs,
        })
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
