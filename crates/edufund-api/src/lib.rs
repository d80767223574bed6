//! # edufund-api: Axum API Services for EduFund
//!
//! REST backend for a school crowdfunding platform. Schools register and
//! submit funding proposals; admins moderate them; approved proposals become
//! public campaigns that accept simulated donations; schools then publish
//! fund-usage reports and an activity timeline.
//!
//! ## API Surface
//!
//! | Prefix              | Module                  | Auth            |
//! |---------------------|-------------------------|-----------------|
//! | `/api/auth/*`       | [`routes::auth`]        | public / session |
//! | `/api/schools/*`    | [`routes::schools`]     | session (verify-npsn public) |
//! | `/api/proposals/*`  | [`routes::proposals`]   | session         |
//! | `/api/reports/*`    | [`routes::reports`]     | session         |
//! | `/api/timeline/*`   | [`routes::timeline`]    | session         |
//! | `/api/upload`       | [`routes::upload`]      | session         |
//! | `/api/dashboard/*`  | [`routes::dashboard`]   | session         |
//! | `/api/donor/*`      | [`routes::donor`]       | public          |
//! | `/uploads/*`        | static files            | public          |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! Cors → TraceLayer → MetricsMiddleware → [AuthMiddleware] → RateLimitMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

/// Request body limit for JSON routes. Upload sets its own.
const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes are mounted outside every middleware except CORS so they
/// stay reachable without credentials or rate-limit quota.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(state.config.rate_limit.clone());

    // Auth runs before rate limiting so rejected requests don't consume
    // quota. `route_layer` keeps unknown paths a plain 404.
    let protected = Router::new()
        .merge(routes::auth::router())
        .merge(routes::schools::router())
        .merge(routes::proposals::router())
        .merge(routes::reports::router())
        .merge(routes::timeline::router())
        .merge(routes::dashboard::router())
        .merge(routes::upload::router(state.config.upload_max_bytes))
        .route_layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .route_layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    let public = Router::new()
        .merge(routes::auth::public_router())
        .merge(routes::schools::public_router())
        .merge(routes::donor::router())
        .merge(openapi::router())
        .route_layer(from_fn(middleware::rate_limit::rate_limit_middleware));

    let api = Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(limiter))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .layer(Extension(metrics))
        .with_state(state.clone());

    Router::new()
        .merge(health)
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(cors_layer(&state.config.cors_origins))
}

/// Any origin when none are configured; otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Liveness probe: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Checks that the stores are accessible, the upload directory can be
/// created, and (when configured) that the database answers.
async fn readiness(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let _ = state.schools.len();
    let _ = state.campaigns.len();

    if let Err(e) = tokio::fs::create_dir_all(&state.config.upload_dir).await {
        tracing::warn!("Upload directory unavailable: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "upload directory unavailable").into_response();
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    tracing::debug!(
        requests = metrics.requests(),
        errors = metrics.errors(),
        "readiness check passed"
    );
    (StatusCode::OK, "ready").into_response()
}
