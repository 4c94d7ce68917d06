//! Generic JSON REST client with bounded, scoped connection slots.
//!
//! Wraps `reqwest` with uniform error translation: non-2xx answers become
//! [`ClientError::Remote`] and requests that never got an answer become
//! [`ClientError::Transport`]. Every failure is logged before it is returned.
//! Nothing is retried here; retry policy belongs to the caller.
//!
//! Requests are issued through an [`ApiSession`], which holds one of the
//! client's `max_connections` slots until it is dropped.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};
use serde_json::Value;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::error::ClientError;

/// Upstream error bodies are cut to this many characters before being
/// carried in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Upper bound on concurrently open sessions.
    pub max_connections: usize,
    /// Idle keep-alive connections retained per host.
    pub max_idle_connections: usize,
    pub user_agent: String,
}

impl ClientConfig {
    #[must_use]
    pub fn from_app_config(config: &seoulpet_core::AppConfig) -> Self {
        Self {
            base_url: config.seoul_api_base_url.clone(),
            timeout_secs: config.http_timeout_secs,
            max_connections: config.http_max_connections,
            max_idle_connections: config.http_max_idle_connections,
            user_agent: config.http_user_agent.clone(),
        }
    }
}

/// Shared HTTP client. Cheap to borrow from many tasks at once; wrap it in an
/// `Arc` to hand it to spawned tasks.
pub struct ApiClient {
    http: Client,
    base_url: Url,
    slots: Semaphore,
    redacted: Vec<String>,
}

impl ApiClient {
    /// Builds a client with the configured timeout, idle pool and slot count.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidUrl`] if `base_url`
    /// does not parse.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(config.max_idle_connections)
            .user_agent(config.user_agent.as_str())
            .build()?;

        // A single trailing slash makes `Url::join` append paths instead of
        // replacing the last segment of the base.
        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            base_url,
            slots: Semaphore::new(config.max_connections.max(1)),
            redacted: Vec::new(),
        })
    }

    /// Registers a secret (such as an API key embedded in request paths) that
    /// must never appear in log output.
    pub fn redact(&mut self, secret: &str) {
        if !secret.is_empty() {
            self.redacted.push(secret.to_owned());
        }
    }

    /// Waits for a free slot and opens a session holding it.
    ///
    /// The slot is returned to the pool when the session is dropped, on every
    /// exit path.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PoolClosed`] if the slot semaphore was closed.
    pub async fn session(&self) -> Result<ApiSession<'_>, ClientError> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| ClientError::PoolClosed)?;
        Ok(ApiSession {
            client: self,
            _permit: permit,
        })
    }

    /// Number of sessions that can be opened right now without waiting.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Resolves `path` against the base URL and appends percent-encoded
    /// query parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl {
                url: path.to_owned(),
                reason: e.to_string(),
            })?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn loggable(&self, url: &Url) -> String {
        self.redacted
            .iter()
            .fold(url.to_string(), |acc, secret| acc.replace(secret.as_str(), "[redacted]"))
    }
}

/// A scoped handle on one connection slot of an [`ApiClient`].
pub struct ApiSession<'a> {
    client: &'a ApiClient,
    _permit: SemaphorePermit<'a>,
}

impl ApiSession<'_> {
    /// # Errors
    ///
    /// See [`ApiSession::request`].
    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<Value, ClientError> {
        self.request(Method::GET, path, params, None, headers).await
    }

    /// # Errors
    ///
    /// See [`ApiSession::request`].
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        headers: &HeaderMap,
    ) -> Result<Value, ClientError> {
        self.request(Method::POST, path, &[], Some(body), headers)
            .await
    }

    /// # Errors
    ///
    /// See [`ApiSession::request`].
    pub async fn put(
        &self,
        path: &str,
        body: &Value,
        headers: &HeaderMap,
    ) -> Result<Value, ClientError> {
        self.request(Method::PUT, path, &[], Some(body), headers)
            .await
    }

    /// # Errors
    ///
    /// See [`ApiSession::request`].
    pub async fn delete(&self, path: &str, headers: &HeaderMap) -> Result<Value, ClientError> {
        self.request(Method::DELETE, path, &[], None, headers).await
    }

    /// Sends one request and parses the response body as JSON.
    ///
    /// An empty 2xx body parses as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] if no response arrived (including timeouts).
    /// - [`ClientError::Remote`] for any non-2xx status, carrying the body text.
    /// - [`ClientError::Deserialize`] if a 2xx body is not valid JSON.
    /// - [`ClientError::InvalidUrl`] if `path` cannot be joined to the base URL.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&Value>,
        headers: &HeaderMap,
    ) -> Result<Value, ClientError> {
        let url = self.client.build_url(path, params)?;
        let target = self.client.loggable(&url);

        let mut request = self
            .client
            .http
            .request(method.clone(), url)
            .headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let e = e.without_url();
                tracing::error!(%method, url = %target, error = %e, "request failed");
                return Err(ClientError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(
                %method,
                url = %target,
                status = status.as_u16(),
                body = %text,
                "upstream returned error status"
            );
            return Err(ClientError::Remote {
                status: status.as_u16(),
                message: truncate_body(&text, status),
            });
        }

        let text = response.text().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!(%method, url = %target, error = %e, "failed to read response body");
            ClientError::Transport(e)
        })?;

        tracing::debug!(%method, url = %target, status = status.as_u16(), "request succeeded");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|source| ClientError::Deserialize {
            context: format!("{method} {target}"),
            source,
        })
    }
}

/// Keeps error messages bounded; falls back to the canonical reason phrase
/// when upstream sent no body.
fn truncate_body(text: &str, status: reqwest::StatusCode) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
