//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 document,
//! served at `/openapi.json` and written to disk by `edufund openapi`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer session token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token from /api/auth/login or /api/auth/admin/login.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EduFund API",
        version = "0.1.0",
        description = "School crowdfunding backend.\n\nSchools register (NPSN-checked), draft funding proposals, and after admin approval receive simulated donations through a public campaign page. Schools then publish fund-usage reports and an activity timeline.\n\nAuthentication: `Authorization: Bearer <session token>`. Donor endpoints, registration, login, and health probes are public.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Auth ────────────────────────────────────────────────────
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::admin_login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        // ── Schools ─────────────────────────────────────────────────
        crate::routes::schools::get_my_profile,
        crate::routes::schools::update_my_profile,
        crate::routes::schools::list_schools,
        crate::routes::schools::get_school,
        crate::routes::schools::verify_npsn,
        // ── Proposals ───────────────────────────────────────────────
        crate::routes::proposals::create_proposal,
        crate::routes::proposals::list_my_proposals,
        crate::routes::proposals::list_proposals,
        crate::routes::proposals::get_proposal,
        crate::routes::proposals::update_proposal,
        crate::routes::proposals::delete_proposal,
        crate::routes::proposals::submit_proposal,
        crate::routes::proposals::decide_proposal,
        // ── Reports ─────────────────────────────────────────────────
        crate::routes::reports::create_report,
        crate::routes::reports::list_my_reports,
        crate::routes::reports::list_reports,
        crate::routes::reports::get_report,
        crate::routes::reports::update_report,
        crate::routes::reports::delete_report,
        crate::routes::reports::submit_report,
        crate::routes::reports::review_report,
        // ── Timeline ────────────────────────────────────────────────
        crate::routes::timeline::create_entry,
        crate::routes::timeline::list_my_entries,
        crate::routes::timeline::delete_entry,
        // ── Donor ───────────────────────────────────────────────────
        crate::routes::donor::list_campaigns,
        crate::routes::donor::get_campaign,
        crate::routes::donor::donate,
        crate::routes::donor::list_donations,
        crate::routes::donor::campaign_timeline,
        crate::routes::donor::campaign_reports,
        crate::routes::donor::stats,
        // ── Upload & dashboards ─────────────────────────────────────
        crate::routes::upload::upload,
        crate::routes::dashboard::admin_dashboard,
        crate::routes::dashboard::school_dashboard,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::auth::Role,
            crate::auth::IssuedSession,
            crate::state::ProposalRecord,
            crate::state::CampaignRecord,
            crate::state::DonationRecord,
            crate::state::ReportRecord,
            crate::state::ReportItem,
            crate::state::TimelineEntryRecord,
            crate::routes::PaginationParams,
            crate::routes::auth::RegisterRequest,
            crate::routes::auth::LoginRequest,
            crate::routes::auth::AdminLoginRequest,
            crate::routes::auth::AuthResponse,
            crate::routes::auth::MeResponse,
            crate::routes::schools::SchoolProfile,
            crate::routes::schools::UpdateProfileRequest,
            crate::routes::schools::NpsnVerification,
            crate::routes::proposals::CreateProposalRequest,
            crate::routes::proposals::UpdateProposalRequest,
            crate::routes::proposals::DecisionRequest,
            crate::routes::reports::CreateReportRequest,
            crate::routes::reports::UpdateReportRequest,
            crate::routes::reports::ReportItemInput,
            crate::routes::timeline::CreateTimelineEntryRequest,
            crate::routes::donor::CampaignView,
            crate::routes::donor::DonationRequest,
            crate::routes::donor::DonationView,
            crate::routes::donor::DonationReceipt,
            crate::routes::donor::PlatformStats,
            crate::routes::upload::UploadResponse,
            crate::routes::dashboard::AdminDashboard,
            crate::routes::dashboard::SchoolDashboard,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "School registration, school and admin sign-in, logout"),
        (name = "schools", description = "School profiles and NPSN registry checks"),
        (name = "proposals", description = "Funding proposals: draft, submit, admin decision"),
        (name = "reports", description = "Fund-usage reports for approved proposals"),
        (name = "timeline", description = "Activity timeline entries for approved proposals"),
        (name = "donor", description = "Public campaign browsing and simulated donations"),
        (name = "upload", description = "Image and document upload"),
        (name = "dashboard", description = "Admin and school summary counts"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
