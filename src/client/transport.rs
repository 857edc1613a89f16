//! Outbound HTTP transport.
//!
//! One GET per call against `base_url.join(path)`. The `Transport` trait is
//! the seam the policy engine wraps; `HttpTransport` is the reqwest-backed
//! implementation used in production.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::config::DownstreamConfig;
use crate::http::X_REQUEST_ID;

/// Response from a single transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Errors raised before a response status was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS, TLS handshake).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The attempt exceeded the configured request timeout.
    #[error("request timed out")]
    Timeout,

    /// Any other failure while sending or reading the response.
    #[error("network error: {0}")]
    Network(String),

    /// The request itself could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Whether this is a connection-level fault rather than a local mistake.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

pub type TransportResult = Result<TransportResponse, TransportError>;

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = TransportResult> + Send + 'a>>;

/// A single outbound GET.
pub trait Transport: Send + Sync {
    /// Perform a GET for `path`, relative to the transport's base address.
    fn get<'a>(&'a self, path: &'a str, request_id: Option<&'a str>) -> TransportFuture<'a>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &DownstreamConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidRequest(format!("base url '{}': {}", config.base_url, e)))?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms));
        if !config.use_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn send(&self, path: &str, request_id: Option<&str>) -> TransportResult {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| TransportError::InvalidRequest(format!("path '{}': {}", path, e)))?;

        let mut request = self.client.get(url.clone());
        if let Some(id) = request_id {
            request = request.header(X_REQUEST_ID, id);
        }

        tracing::debug!(url = %url, "Calling downstream");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, path: &'a str, request_id: Option<&'a str>) -> TransportFuture<'a> {
        Box::pin(self.send(path, request_id))
    }
}
