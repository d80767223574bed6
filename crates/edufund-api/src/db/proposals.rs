//! Proposal persistence (`proposals` table).
//!
//! Approval writes the proposal and its campaign in one transaction, so a
//! restart never sees an approved proposal without a campaign.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{from_doc, to_doc, DocRow};
use crate::state::{CampaignRecord, ProposalRecord};

pub async fn insert(pool: &PgPool, record: &ProposalRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO proposals (id, school_id, status, doc, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.school_id)
    .bind(record.status.as_str())
    .bind(to_doc(record)?)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, record: &ProposalRecord) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    update_on(&mut conn, record).await
}

async fn update_on(conn: &mut PgConnection, record: &ProposalRecord) -> Result<(), sqlx::Error> {
    let result =
        sqlx::query("UPDATE proposals SET status = $1, doc = $2, updated_at = $3 WHERE id = $4")
            .bind(record.status.as_str())
            .bind(to_doc(record)?)
            .bind(record.updated_at)
            .bind(record.id)
            .execute(conn)
            .await?;
    super::require_row(result.rows_affected())
}

/// Persist an approval together with the campaign it creates.
pub async fn approve_with_campaign(
    pool: &PgPool,
    proposal: &ProposalRecord,
    campaign: &CampaignRecord,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    update_on(&mut tx, proposal).await?;
    super::campaigns::insert_on(&mut tx, campaign).await?;
    tx.commit().await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM proposals WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<ProposalRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocRow>("SELECT doc FROM proposals ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|row| from_doc("proposals", row.doc))
        .collect()
}
