//! # Dashboards
//!
//! Summary counts for the admin console and for a signed-in school.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use edufund_core::Rupiah;
use edufund_state::{ProposalStatus, ReportStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::state::AppState;

/// Count per status, with every status present.
type StatusCounts = BTreeMap<String, usize>;

/// Tally `seen` labels, seeding every label in `all` with zero.
fn status_counts(
    all: impl IntoIterator<Item = &'static str>,
    seen: impl IntoIterator<Item = &'static str>,
) -> StatusCounts {
    let mut counts: StatusCounts = all.into_iter().map(|s| (s.to_string(), 0)).collect();
    for status in seen {
        *counts.entry(status.to_string()).or_default() += 1;
    }
    counts
}

fn proposal_labels() -> impl Iterator<Item = &'static str> {
    ProposalStatus::ALL.into_iter().map(|s| s.as_str())
}

fn report_labels() -> impl Iterator<Item = &'static str> {
    ReportStatus::ALL.into_iter().map(|s| s.as_str())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminDashboard {
    pub schools: usize,
    pub verified_schools: usize,
    pub proposals: BTreeMap<String, usize>,
    pub reports: BTreeMap<String, usize>,
    pub campaigns: usize,
    pub donations: usize,
    #[schema(value_type = u64)]
    pub total_collected: Rupiah,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SchoolDashboard {
    pub proposals: BTreeMap<String, usize>,
    pub reports: BTreeMap<String, usize>,
    pub timeline_entries: usize,
    pub campaigns: usize,
    #[schema(value_type = u64)]
    pub total_collected: Rupiah,
    pub donors_count: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/admin", get(admin_dashboard))
        .route("/api/dashboard/school", get(school_dashboard))
}

/// GET /api/dashboard/admin
#[utoipa::path(
    get,
    path = "/api/dashboard/admin",
    responses(
        (status = 200, description = "Platform summary", body = AdminDashboard),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
    ),
    tag = "dashboard"
)]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<AdminDashboard>, AppError> {
    require_role(&caller, Role::Admin)?;

    let proposals = state.proposals.list();
    let reports = state.reports.list();
    let campaigns = state.campaigns.list();

    Ok(Json(AdminDashboard {
        schools: state.schools.len(),
        verified_schools: state.schools.count(|s| s.npsn_verified),
        proposals: status_counts(proposal_labels(), proposals.iter().map(|p| p.status.as_str())),
        reports: status_counts(report_labels(), reports.iter().map(|r| r.status.as_str())),
        campaigns: campaigns.len(),
        donations: state.donations.len(),
        total_collected: campaigns.iter().map(|c| c.collected_amount).sum(),
    }))
}

/// GET /api/dashboard/school
#[utoipa::path(
    get,
    path = "/api/dashboard/school",
    responses(
        (status = 200, description = "Caller's summary", body = SchoolDashboard),
        (status = 403, description = "Not a school session", body = crate::error::ErrorBody),
    ),
    tag = "dashboard"
)]
pub async fn school_dashboard(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SchoolDashboard>, AppError> {
    let school_id = caller.require_school()?;

    let proposals = state.proposals.filter(|p| p.school_id == school_id);
    let reports = state.reports.filter(|r| r.school_id == school_id);
    let campaigns = state.campaigns.filter(|c| c.school_id == school_id);

    Ok(Json(SchoolDashboard {
        proposals: status_counts(proposal_labels(), proposals.iter().map(|p| p.status.as_str())),
        reports: status_counts(report_labels(), reports.iter().map(|r| r.status.as_str())),
        timeline_entries: state.timeline.count(|e| e.school_id == school_id),
        campaigns: campaigns.len(),
        total_collected: campaigns.iter().map(|c| c.collected_amount).sum(),
        donors_count: campaigns.iter().map(|c| c.donors_count).sum(),
    }))
}
