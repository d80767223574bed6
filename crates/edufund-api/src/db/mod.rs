//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx. When `DATABASE_URL` is set, every
//! mutation is written through to Postgres and the in-memory stores are
//! hydrated from it on startup. When absent, the API runs in-memory only.
//!
//! Records are stored as JSONB documents, one table per collection. Lifecycle
//! rules are enforced in `edufund-state`, not in SQL; the schema only
//! enforces uniqueness, references, and non-negative amounts.

pub mod campaigns;
pub mod proposals;
pub mod reports;
pub mod schools;
pub mod timeline;

use edufund_core::Rupiah;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run embedded migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Serialize a record into its JSONB document.
pub(crate) fn to_doc<T: Serialize>(record: &T) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(record).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize document");
        sqlx::Error::Encode(Box::new(e))
    })
}

/// Deserialize a JSONB document. A malformed document fails the load
/// rather than being skipped or defaulted.
pub(crate) fn from_doc<T: DeserializeOwned>(
    table: &'static str,
    doc: serde_json::Value,
) -> Result<T, sqlx::Error> {
    serde_json::from_value(doc).map_err(|e| {
        tracing::error!(table, error = %e, "malformed document in database");
        sqlx::Error::Decode(Box::new(e))
    })
}

/// Rupiah amounts are `BIGINT` columns.
pub(crate) fn amount_to_i64(amount: Rupiah) -> Result<i64, sqlx::Error> {
    i64::try_from(amount.value()).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

pub(crate) fn i64_to_amount(value: i64) -> Result<Rupiah, sqlx::Error> {
    u64::try_from(value)
        .map(Rupiah)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// An `UPDATE` that matched nothing means the in-memory record has no row.
pub(crate) fn require_row(rows_affected: u64) -> Result<(), sqlx::Error> {
    if rows_affected == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
pub(crate) struct DocRow {
    pub doc: serde_json::Value,
}
