//! Request-scoped middleware: request ids, bearer auth and the per-process
//! rate limiter guarding the data routes.
//!
//! Rejections use the same `{ error, meta }` envelope as the handlers so
//! clients can correlate them through `meta.request_id`.

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use seoulpet_core::{AppConfig, Environment};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";
/// Longer client-supplied ids are replaced rather than echoed.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id attached to every request by [`request_id`].
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    fn from_request(req: &Request) -> String {
        req.extensions()
            .get::<RequestId>()
            .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone())
    }
}

/// Bearer tokens accepted on the data routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
}

impl AuthState {
    /// Builds the token set from [`AppConfig::api_keys`].
    ///
    /// # Errors
    ///
    /// Fails outside [`Environment::Development`] when no key is configured.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(config.api_keys.iter().cloned(), &config.env)
    }

    /// An empty key set leaves the routes open, which only development allows.
    ///
    /// # Errors
    ///
    /// Fails when `keys` is empty and `env` is not development.
    pub fn new(
        keys: impl IntoIterator<Item = String>,
        env: &Environment,
    ) -> anyhow::Result<Self> {
        let api_keys: HashSet<String> = keys.into_iter().collect();

        if api_keys.is_empty() {
            if *env != Environment::Development {
                anyhow::bail!("SEOULPET_API_KEYS must list at least one bearer token in {env}");
            }
            tracing::warn!("no SEOULPET_API_KEYS configured; data routes are unauthenticated");
        } else {
            tracing::info!(keys = api_keys.len(), "bearer auth enabled");
        }

        Ok(Self {
            api_keys: Arc::new(api_keys),
        })
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request counter shared by all protected routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    current: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            current: Arc::new(Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    /// Counts one request. Returns the wait until the window resets when the
    /// budget is already spent.
    async fn acquire(&self) -> Result<(), Duration> {
        let mut current = self.current.lock().await;
        let elapsed = current.started_at.elapsed();
        if elapsed >= self.window {
            current.started_at = Instant::now();
            current.count = 0;
        }

        if current.count >= self.max_requests {
            return Err(self.window.saturating_sub(elapsed));
        }
        current.count += 1;
        Ok(())
    }
}

/// Reuses the caller's `x-request-id` when it is short printable ASCII,
/// otherwise mints a UUID. The id lands in request extensions and is echoed
/// on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled() {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(header::AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => {
            let request_id = RequestId::from_request(&req);
            tracing::warn!(%request_id, path = %req.uri().path(), "rejected request without a valid bearer token");
            ApiError::new(request_id, "unauthorized", "missing or invalid bearer token")
                .into_response()
        }
    }
}

pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    match rate_limit.acquire().await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            let request_id = RequestId::from_request(&req);
            let mut res = ApiError::new(
                request_id,
                "rate_limited",
                format!("rate limit of {} requests exceeded", rate_limit.max_requests),
            )
            .into_response();
            // Round up so clients never retry inside the spent window.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            res
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header; the scheme is
/// matched case-insensitively.
fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let raw = value?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}
