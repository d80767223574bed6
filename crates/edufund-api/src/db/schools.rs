//! School account persistence (`schools` table).

use sqlx::PgPool;

use super::{from_doc, to_doc, DocRow};
use crate::state::SchoolRecord;

pub async fn insert(pool: &PgPool, record: &SchoolRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO schools (id, email, npsn, doc, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.email.as_str())
    .bind(record.npsn.as_str())
    .bind(to_doc(record)?)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace the stored document. Email and NPSN are immutable.
///
/// The school name is copied onto each of its campaigns in the same
/// transaction.
pub async fn update(pool: &PgPool, record: &SchoolRecord) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("UPDATE schools SET doc = $1, updated_at = $2 WHERE id = $3")
        .bind(to_doc(record)?)
        .bind(record.updated_at)
        .bind(record.id)
        .execute(&mut *tx)
        .await?;
    super::require_row(result.rows_affected())?;
    super::campaigns::rename_school_on(&mut tx, record.id, &record.name).await?;
    tx.commit().await
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<SchoolRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocRow>("SELECT doc FROM schools ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|row| from_doc("schools", row.doc))
        .collect()
}
