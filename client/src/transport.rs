//! Outbound request transport
//!
//! `AuthTransport` abstracts the wire so the coordinator can be tested
//! against a scripted mock. `HttpTransport` is the reqwest-backed
//! implementation speaking to the Muse auth API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

/// Applied to every outbound call, refresh and logout included, so a
/// stalled auth endpoint cannot hold the refresh coordination forever.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures delivering a request or reading its response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// Non-success HTTP status from an auth endpoint.
    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Malformed response body: {0}")]
    Decode(String),
}

/// A request the coordinator sends on behalf of a caller.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: reqwest::Method,
    /// Path relative to the API base URL, e.g. `/tracks`.
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Whether a bearer token should be attached and 401 handling
    /// should apply.
    pub requires_auth: bool,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: reqwest::Method::GET,
            path: path.into(),
            body: None,
            requires_auth: true,
            timeout: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            path: path.into(),
            body: Some(body),
            requires_auth: true,
            timeout: None,
        }
    }
}

/// Response handed back to the caller. The coordinator only inspects
/// the status code; the body passes through untouched.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Token pair returned by the refresh endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Deliver a request, attaching `bearer` when present.
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError>;

    /// Exchange a refresh token for a new pair. A 401 from the server
    /// surfaces as `TransportError::Status(401)`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TransportError>;

    /// Invalidate a refresh token server-side. Idempotent.
    async fn logout(&self, refresh_token: &str) -> Result<(), TransportError>;
}

/// HTTP transport backed by a shared reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Builds a transport whose every call times out after `timeout`.
    /// Per-request timeouts on [`ApiRequest`] still apply on top.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|error| {
                warn!(%error, "failed to build HTTP client, falling back to defaults");
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);

        debug!(status, path = %request.path, "request completed");
        Ok(ApiResponse { status, body })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TransportError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }
}
