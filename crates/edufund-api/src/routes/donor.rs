//! # Donor API
//!
//! Public, unauthenticated campaign browsing and simulated donations.
//! No payment is processed; a donation is recorded and the campaign's
//! collected amount and donor count are incremented atomically.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use edufund_core::Rupiah;
use edufund_state::{ProposalAction, ReportStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::timeline::sort_newest_first;
use super::PaginationParams;
use crate::error::AppError;
use crate::extractors::{check_len, extract_validated_json, Validate};
use crate::state::{AppState, CampaignRecord, DonationRecord, ReportRecord, TimelineEntryRecord};

/// Donor name shown for anonymous donations.
pub const ANONYMOUS_DONOR: &str = "Anonim";

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct CampaignQuery {
    /// Exact category, case-insensitive.
    pub category: Option<String>,
    /// Substring search over title, description, and school name.
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A campaign with its funding progress.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: CampaignRecord,
    /// Collected as a percentage of target, capped at 100.
    pub progress_percent: u8,
}

impl From<CampaignRecord> for CampaignView {
    fn from(campaign: CampaignRecord) -> Self {
        let progress_percent = campaign.collected_amount.percent_of(campaign.target_amount);
        Self {
            campaign,
            progress_percent,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DonationRequest {
    /// Required unless `anonymous` is set.
    #[serde(default)]
    pub donor_name: Option<String>,
    /// Whole Rupiah, at least 10.000.
    pub amount: u64,
    #[serde(default)]
    pub anonymous: bool,
    pub message: Option<String>,
}

impl Validate for DonationRequest {
    fn validate(&self) -> Result<(), String> {
        let name = self.donor_name.as_deref().map(str::trim).unwrap_or("");
        if !self.anonymous && name.is_empty() {
            return Err("donor_name is required unless the donation is anonymous".into());
        }
        check_len("donor_name", name, 100)?;
        if let Some(message) = &self.message {
            check_len("message", message, 500)?;
        }
        Ok(())
    }
}

/// A donation as listed publicly. Anonymous donors are masked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DonationView {
    pub id: Uuid,
    pub donor_name: String,
    #[schema(value_type = u64)]
    pub amount: Rupiah,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&DonationRecord> for DonationView {
    fn from(record: &DonationRecord) -> Self {
        Self {
            id: record.id,
            donor_name: if record.anonymous {
                ANONYMOUS_DONOR.to_string()
            } else {
                record.donor_name.clone()
            },
            amount: record.amount,
            message: record.message.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DonationReceipt {
    pub donation: DonationView,
    pub campaign: CampaignView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlatformStats {
    pub campaigns: usize,
    pub schools: usize,
    pub donations: usize,
    #[schema(value_type = u64)]
    pub total_collected: Rupiah,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/donor/campaigns", get(list_campaigns))
        .route("/api/donor/campaigns/{id}", get(get_campaign))
        .route(
            "/api/donor/campaigns/{id}/donations",
            get(list_donations).post(donate),
        )
        .route("/api/donor/campaigns/{id}/timeline", get(campaign_timeline))
        .route("/api/donor/campaigns/{id}/reports", get(campaign_reports))
        .route("/api/donor/stats", get(stats))
}

fn campaign_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("campaign {id} not found"))
}

fn matches_query(campaign: &CampaignRecord, category: Option<&str>, needle: Option<&str>) -> bool {
    if let Some(category) = category {
        if !campaign.category.eq_ignore_ascii_case(category) {
            return false;
        }
    }
    match needle {
        Some(needle) => [&campaign.title, &campaign.description, &campaign.school_name]
            .iter()
            .any(|field| field.to_lowercase().contains(needle)),
        None => true,
    }
}

/// GET /api/donor/campaigns: newest first.
#[utoipa::path(
    get,
    path = "/api/donor/campaigns",
    params(CampaignQuery),
    responses(
        (status = 200, description = "Active campaigns", body = Vec<CampaignView>),
    ),
    security(()),
    tag = "donor"
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<CampaignQuery>,
) -> Json<Vec<CampaignView>> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut campaigns = state
        .campaigns
        .filter(|c| matches_query(c, category, needle.as_deref()));
    campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let pagination = PaginationParams {
        limit: query.limit,
        offset: query.offset,
    };
    Json(
        pagination
            .page(campaigns)
            .into_iter()
            .map(CampaignView::from)
            .collect(),
    )
}

/// GET /api/donor/campaigns/{id}
#[utoipa::path(
    get,
    path = "/api/donor/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign found", body = CampaignView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "donor"
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignView>, AppError> {
    state
        .campaigns
        .get(&id)
        .map(|c| Json(CampaignView::from(c)))
        .ok_or_else(|| campaign_not_found(id))
}

/// POST /api/donor/campaigns/{id}/donations: record a simulated donation.
///
/// The donation row and the counter increment commit together: in one SQL
/// transaction when persistence is enabled, then under the campaign and
/// donation store write locks in memory.
#[utoipa::path(
    post,
    path = "/api/donor/campaigns/{id}/donations",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    request_body = DonationRequest,
    responses(
        (status = 201, description = "Donation recorded", body = DonationReceipt),
        (status = 404, description = "Campaign not found", body = crate::error::ErrorBody),
        (status = 409, description = "Campaign is not accepting donations", body = crate::error::ErrorBody),
        (status = 422, description = "Below minimum or invalid", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "donor"
)]
pub async fn donate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<DonationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DonationReceipt>), AppError> {
    let req = extract_validated_json(body)?;
    let amount = Rupiah(req.amount).require_donation_minimum()?;

    if !state.campaigns.contains(&id) {
        return Err(campaign_not_found(id));
    }
    let proposal = state
        .proposals
        .get(&id)
        .ok_or_else(|| campaign_not_found(id))?;
    proposal.status.require(ProposalAction::ReceiveDonation)?;

    let donation = DonationRecord {
        id: Uuid::new_v4(),
        campaign_id: id,
        donor_name: req
            .donor_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS_DONOR.to_string()),
        amount,
        anonymous: req.anonymous,
        message: req.message.filter(|m| !m.trim().is_empty()),
        created_at: Utc::now(),
    };

    if let Some(pool) = &state.db_pool {
        crate::db::campaigns::record_donation(pool, &donation)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => campaign_not_found(id),
                other => AppError::database("record donation", other),
            })?;
    }

    let campaign = state
        .campaigns
        .try_update_with(&id, &state.donations, |c, donations| {
            c.apply_donation(amount)?;
            donations.insert(donation.id, donation.clone());
            Ok::<_, AppError>(c.clone())
        })
        .ok_or_else(|| campaign_not_found(id))??;

    metrics::counter!("edufund_donations_total").increment(1);
    metrics::counter!("edufund_donation_amount_total").increment(amount.value());
    tracing::info!(
        campaign_id = %id,
        donation_id = %donation.id,
        amount = amount.value(),
        collected = campaign.collected_amount.value(),
        donors = campaign.donors_count,
        "donation recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(DonationReceipt {
            donation: DonationView::from(&donation),
            campaign: CampaignView::from(campaign),
        }),
    ))
}

/// GET /api/donor/campaigns/{id}/donations: newest first.
#[utoipa::path(
    get,
    path = "/api/donor/campaigns/{id}/donations",
    params(("id" = Uuid, Path, description = "Campaign ID"), PaginationParams),
    responses(
        (status = 200, description = "Donations", body = Vec<DonationView>),
        (status = 404, description = "Campaign not found", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "donor"
)]
pub async fn list_donations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<Vec<DonationView>>, AppError> {
    let mut donations = state
        .campaigns
        .read_with(&id, &state.donations, |_, donations| {
            donations
                .values()
                .filter(|d| d.campaign_id == id)
                .cloned()
                .collect::<Vec<_>>()
        })
        .ok_or_else(|| campaign_not_found(id))?;
    donations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(
        pagination
            .page(donations)
            .iter()
            .map(DonationView::from)
            .collect(),
    ))
}

/// GET /api/donor/campaigns/{id}/timeline
#[utoipa::path(
    get,
    path = "/api/donor/campaigns/{id}/timeline",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Activity gallery, newest first", body = Vec<TimelineEntryRecord>),
        (status = 404, description = "Campaign not found", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "donor"
)]
pub async fn campaign_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimelineEntryRecord>>, AppError> {
    if !state.campaigns.contains(&id) {
        return Err(campaign_not_found(id));
    }
    let mut entries = state.timeline.filter(|e| e.proposal_id == id);
    sort_newest_first(&mut entries);
    Ok(Json(entries))
}

/// GET /api/donor/campaigns/{id}/reports: approved reports only.
#[utoipa::path(
    get,
    path = "/api/donor/campaigns/{id}/reports",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Approved fund-usage reports", body = Vec<ReportRecord>),
        (status = 404, description = "Campaign not found", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "donor"
)]
pub async fn campaign_reports(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReportRecord>>, AppError> {
    if !state.campaigns.contains(&id) {
        return Err(campaign_not_found(id));
    }
    let mut reports = state
        .reports
        .filter(|r| r.proposal_id == id && r.status == ReportStatus::Approved);
    reports.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(Json(reports))
}

/// GET /api/donor/stats
#[utoipa::path(
    get,
    path = "/api/donor/stats",
    responses(
        (status = 200, description = "Platform totals", body = PlatformStats),
    ),
    security(()),
    tag = "donor"
)]
pub async fn stats(State(state): State<AppState>) -> Json<PlatformStats> {
    let campaigns = state.campaigns.list();
    Json(PlatformStats {
        campaigns: campaigns.len(),
        schools: state.schools.len(),
        donations: state.donations.len(),
        total_collected: campaigns.iter().map(|c| c.collected_amount).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(title: &str, category: &str) -> CampaignRecord {
        CampaignRecord {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            school_name: "SMP Negeri 3 Malang".into(),
            title: title.into(),
            description: "Pengadaan buku perpustakaan".into(),
            category: category.into(),
            cover_image_url: None,
            target_amount: Rupiah(2_000_000),
            collected_amount: Rupiah(500_000),
            donors_count: 3,
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn query_matching() {
        let c = campaign("Buku Cerita Anak", "Literasi");
        assert!(matches_query(&c, None, None));
        assert!(matches_query(&c, Some("literasi"), None));
        assert!(!matches_query(&c, Some("sarana"), None));
        assert!(matches_query(&c, None, Some("cerita")));
        assert!(matches_query(&c, None, Some("malang")));
        assert!(!matches_query(&c, None, Some("komputer")));
    }

    #[test]
    fn view_reports_progress() {
        let view = CampaignView::from(campaign("Buku", "literasi"));
        assert_eq!(view.progress_percent, 25);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "Buku");
        assert_eq!(json["progress_percent"], 25);
    }

    #[test]
    fn anonymous_donations_are_masked() {
        let record = DonationRecord {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            donor_name: "Budi Santoso".into(),
            amount: Rupiah(50_000),
            anonymous: true,
            message: None,
            created_at: Utc::now(),
        };
        assert_eq!(DonationView::from(&record).donor_name, ANONYMOUS_DONOR);
    }

    #[test]
    fn donation_request_requires_name_unless_anonymous() {
        let named = DonationRequest {
            donor_name: None,
            amount: 10_000,
            anonymous: false,
            message: None,
        };
        assert!(named.validate().is_err());
        let anon = DonationRequest {
            donor_name: None,
            amount: 10_000,
            anonymous: true,
            message: None,
        };
        assert!(anon.validate().is_ok());
    }
}
