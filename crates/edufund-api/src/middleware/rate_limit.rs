//! # Per-Client Rate Limiting
//!
//! Fixed-window quota per client. Signed-in callers are keyed by their
//! session subject (`school:<id>`, `admin:<name>`), so a school behind a
//! shared NAT keeps its own quota. Public callers (donors, registration)
//! are keyed by the TCP peer address. The first `X-Forwarded-For` hop is
//! used instead only when `trust_forwarded_for` is set, i.e. behind a
//! proxy that overwrites the header. Requests with neither share the
//! `anonymous` bucket. In-memory, per process.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::auth::CallerIdentity;
use crate::error::ErrorBody;

/// Buckets are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests admitted per client per window.
    pub max_requests: u64,
    pub window_secs: u64,
    /// Key public callers by `X-Forwarded-For` instead of the peer address.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 600,
            window_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// One client's current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    used: u64,
}

impl Window {
    fn open(now: Instant) -> Self {
        Self { opened: now, used: 0 }
    }

    fn expired(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.opened) >= length
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Admitted,
    /// Seconds until the client's window reopens.
    Throttled { retry_after: u64 },
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u64,
    window: Duration,
    trust_forwarded_for: bool,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            trust_forwarded_for: config.trust_forwarded_for,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn admit(&self, client: &str) -> Admission {
        let now = Instant::now();
        let mut windows = self.windows.lock();

        if windows.len() > SWEEP_THRESHOLD {
            let length = self.window;
            windows.retain(|_, w| !w.expired(now, length));
        }

        let window = windows
            .entry(client.to_string())
            .or_insert_with(|| Window::open(now));
        if window.expired(now, self.window) {
            *window = Window::open(now);
        }

        if window.used >= self.max_requests {
            let elapsed = now.duration_since(window.opened);
            let remaining = self.window.saturating_sub(elapsed);
            return Admission::Throttled {
                retry_after: remaining.as_secs().max(1),
            };
        }
        window.used += 1;
        Admission::Admitted
    }

    /// Quota key for a request.
    fn client_key(&self, request: &Request) -> String {
        if let Some(caller) = request.extensions().get::<CallerIdentity>() {
            return caller.subject.clone();
        }
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return format!("ip:{ip}");
            }
        }
        match request.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(peer)) => format!("ip:{}", peer.ip()),
            None => "anonymous".to_string(),
        }
    }
}

pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return next.run(request).await;
    };

    let client = limiter.client_key(&request);
    match limiter.admit(&client) {
        Admission::Admitted => next.run(request).await,
        Admission::Throttled { retry_after } => {
            tracing::warn!(client = %client, retry_after, "rate limit exceeded");
            metrics::counter!("edufund_rate_limited_total").increment(1);
            let body = ErrorBody::new(
                "RATE_LIMITED",
                format!("too many requests; retry in {retry_after}s"),
            );
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}
