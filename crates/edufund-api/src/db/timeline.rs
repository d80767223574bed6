//! Campaign timeline persistence (`timeline_entries` table). Entries are
//! immutable once created; they can only be deleted.

use sqlx::PgPool;
use uuid::Uuid;

use super::{from_doc, to_doc, DocRow};
use crate::state::TimelineEntryRecord;

pub async fn insert(pool: &PgPool, record: &TimelineEntryRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO timeline_entries (id, school_id, proposal_id, doc, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(record.id)
    .bind(record.school_id)
    .bind(record.proposal_id)
    .bind(to_doc(record)?)
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM timeline_entries WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<TimelineEntryRecord>, sqlx::Error> {
    let rows =
        sqlx::query_as::<_, DocRow>("SELECT doc FROM timeline_entries ORDER BY created_at")
            .fetch_all(pool)
            .await?;
    rows.into_iter()
        .map(|row| from_doc("timeline_entries", row.doc))
        .collect()
}
