//! # edufund-api: Binary Entry Point
//!
//! Loads `.env`, configures tracing and the Prometheus recorder, connects
//! the optional database and NPSN client, hydrates state, and serves.

use axum::routing::get;
use axum::Router;
use edufund_api::config::{AppConfig, LogFormat};
use edufund_api::state::AppState;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    let log_format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref())?;
    init_tracing(log_format);

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    let port = config.port;

    // Initialize database pool (optional: absent means in-memory only).
    let db_pool = edufund_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    // NPSN registry client. Without one, registrations are unverified.
    let npsn_client = match edufund_npsn::NpsnConfig::from_env() {
        Ok(npsn_config) => match edufund_npsn::NpsnClient::new(npsn_config) {
            Ok(client) => {
                tracing::info!(base_url = %client.base_url(), "NPSN lookup client configured");
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to create NPSN client: {e}");
                return Err(e.into());
            }
        },
        Err(e) => {
            tracing::warn!("NPSN lookup not configured: {e}. Schools will register unverified.");
            None
        }
    };

    let state = AppState::with_config(config, npsn_client, db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let prometheus = PrometheusBuilder::new().install_recorder()?;
    let app = edufund_api::app(state).merge(Router::new().route(
        "/metrics",
        get(move || std::future::ready(prometheus.render())),
    ));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("EduFund API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("EduFund API stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
