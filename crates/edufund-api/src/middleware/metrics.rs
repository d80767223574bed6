//! # Request Metrics
//!
//! Process-local tallies used by the readiness probe, plus `metrics`
//! series labelled by route template and status. The binary installs a
//! Prometheus recorder and serves them at `/metrics`; without a recorder
//! the `metrics` calls are no-ops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Default)]
struct Tally {
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
}

/// Shared request tallies. Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    tally: Arc<Tally>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> u64 {
        self.tally.requests.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx or 5xx status.
    pub fn errors(&self) -> u64 {
        self.tally.client_errors.load(Ordering::Relaxed)
            + self.tally.server_errors.load(Ordering::Relaxed)
    }

    pub fn server_errors(&self) -> u64 {
        self.tally.server_errors.load(Ordering::Relaxed)
    }

    fn record(&self, status: axum::http::StatusCode) {
        self.tally.requests.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() {
            self.tally.client_errors.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            self.tally.server_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let tallies = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    // Route templates keep label cardinality bounded; ids never become labels.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();

    if let Some(tallies) = tallies {
        tallies.record(status);
    }

    metrics::counter!(
        "edufund_http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(
        "edufund_http_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(started.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app(metrics: ApiMetrics) -> Router {
        Router::new()
            .route("/api/donor/campaigns/{id}", get(|| async { "ok" }))
            .route("/boom", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .layer(from_fn(metrics_middleware))
            .layer(axum::Extension(metrics))
    }

    #[tokio::test]
    async fn tallies_requests_by_class() {
        let metrics = ApiMetrics::new();
        for uri in [
            "/api/donor/campaigns/1",
            "/api/donor/campaigns/2",
            "/boom",
            "/missing",
        ] {
            app(metrics.clone())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
        }
        assert_eq!(metrics.requests(), 4);
        assert_eq!(metrics.errors(), 2);
        assert_eq!(metrics.server_errors(), 1);
    }
}
