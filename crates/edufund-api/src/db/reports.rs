//! Fund-usage report persistence (`reports` table).

use sqlx::PgPool;
use uuid::Uuid;

use super::{from_doc, to_doc, DocRow};
use crate::state::ReportRecord;

pub async fn insert(pool: &PgPool, record: &ReportRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reports (id, school_id, proposal_id, status, doc, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id)
    .bind(record.school_id)
    .bind(record.proposal_id)
    .bind(record.status.as_str())
    .bind(to_doc(record)?)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, record: &ReportRecord) -> Result<(), sqlx::Error> {
    let result =
        sqlx::query("UPDATE reports SET status = $1, doc = $2, updated_at = $3 WHERE id = $4")
            .bind(record.status.as_str())
            .bind(to_doc(record)?)
            .bind(record.updated_at)
            .bind(record.id)
            .execute(pool)
            .await?;
    super::require_row(result.rows_affected())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reports WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<ReportRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocRow>("SELECT doc FROM reports ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|row| from_doc("reports", row.doc))
        .collect()
}
