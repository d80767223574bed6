//! Campaign and donation persistence (`campaigns`, `donations` tables).
//!
//! `collected_amount` and `donors_count` live in real columns and are only
//! ever changed by relative `UPDATE ... SET x = x + $n` inside the same
//! transaction that inserts the donation. The counters embedded in `doc`
//! are ignored on load; the columns win.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use edufund_core::Rupiah;

use super::{amount_to_i64, from_doc, i64_to_amount, to_doc, DocRow};
use crate::state::{CampaignRecord, DonationRecord};

#[derive(sqlx::FromRow)]
struct CampaignRow {
    doc: serde_json::Value,
    collected_amount: i64,
    donors_count: i64,
}

impl CampaignRow {
    fn into_record(self) -> Result<CampaignRecord, sqlx::Error> {
        let mut record: CampaignRecord = from_doc("campaigns", self.doc)?;
        record.collected_amount = i64_to_amount(self.collected_amount)?;
        record.donors_count = u64::try_from(self.donors_count)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(record)
    }
}

/// Insert a new campaign on an open connection or transaction.
pub(crate) async fn insert_on(
    conn: &mut PgConnection,
    record: &CampaignRecord,
) -> Result<(), sqlx::Error> {
    let donors = i64::try_from(record.donors_count).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query(
        "INSERT INTO campaigns
             (id, school_id, collected_amount, donors_count, doc, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id)
    .bind(record.school_id)
    .bind(amount_to_i64(record.collected_amount)?)
    .bind(donors)
    .bind(to_doc(record)?)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert a donation and bump its campaign's counters atomically.
///
/// Fails with `RowNotFound` if the campaign does not exist; nothing is
/// committed in that case.
pub async fn record_donation(pool: &PgPool, donation: &DonationRecord) -> Result<(), sqlx::Error> {
    let amount = amount_to_i64(donation.amount)?;
    let mut tx = pool.begin().await?;

    let bumped = sqlx::query(
        "UPDATE campaigns
            SET collected_amount = collected_amount + $1,
                donors_count = donors_count + 1,
                updated_at = $2
          WHERE id = $3",
    )
    .bind(amount)
    .bind(donation.created_at)
    .bind(donation.campaign_id)
    .execute(&mut *tx)
    .await?;
    if bumped.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    sqlx::query(
        "INSERT INTO donations (id, campaign_id, amount, doc, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(donation.id)
    .bind(donation.campaign_id)
    .bind(amount)
    .bind(to_doc(donation)?)
    .bind(donation.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Rewrite the denormalized school name on every campaign of a school.
pub(crate) async fn rename_school_on(
    conn: &mut PgConnection,
    school_id: Uuid,
    school_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE campaigns
            SET doc = jsonb_set(doc, '{school_name}', to_jsonb($2::text))
          WHERE school_id = $1 AND doc->>'school_name' IS DISTINCT FROM $2",
    )
    .bind(school_id)
    .bind(school_name)
    .execute(conn)
    .await?;
    Ok(())
}

/// Overwrite a campaign's counters. Used only when reconciling against the
/// donation log at startup.
pub async fn set_counters(
    pool: &PgPool,
    id: Uuid,
    collected: Rupiah,
    donors: u64,
) -> Result<(), sqlx::Error> {
    let donors = i64::try_from(donors).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query(
        "UPDATE campaigns SET collected_amount = $1, donors_count = $2, updated_at = $3
          WHERE id = $4",
    )
    .bind(amount_to_i64(collected)?)
    .bind(donors)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<CampaignRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CampaignRow>(
        "SELECT doc, collected_amount, donors_count FROM campaigns ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(CampaignRow::into_record).collect()
}

pub async fn load_all_donations(pool: &PgPool) -> Result<Vec<DonationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocRow>("SELECT doc FROM donations ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|row| from_doc("donations", row.doc))
        .collect()
}
