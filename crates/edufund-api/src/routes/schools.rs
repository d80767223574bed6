//! # School Accounts API
//!
//! Profile view and edit for the signed-in school, the admin school
//! directory, and a public NPSN registry check used by the registration form.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use edufund_core::Npsn;
use edufund_npsn::NpsnLookup;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::PaginationParams;
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{check_len, extract_validated_json, require_text, Validate};
use crate::state::{AppState, SchoolRecord};

/// A school account as shown to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchoolProfile {
    pub id: Uuid,
    pub name: String,
    pub npsn: String,
    pub email: String,
    pub npsn_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub principal_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SchoolRecord> for SchoolProfile {
    fn from(record: &SchoolRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            npsn: record.npsn.to_string(),
            email: record.email.to_string(),
            npsn_verified: record.npsn_verified,
            registry_name: record.registry_name.clone(),
            phone: record.phone.clone(),
            address: record.address.clone(),
            principal_name: record.principal_name.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Profile edit. Absent fields are left unchanged; NPSN and email are fixed
/// at registration.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub principal_name: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("name", name, 200)?;
        }
        if let Some(phone) = &self.phone {
            check_len("phone", phone, 32)?;
        }
        if let Some(address) = &self.address {
            check_len("address", address, 500)?;
        }
        if let Some(principal) = &self.principal_name {
            check_len("principal_name", principal, 200)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyNpsnQuery {
    /// 8-digit school registry number.
    pub npsn: String,
}

/// Result of a registry check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NpsnVerification {
    pub npsn: String,
    pub verified: bool,
    pub name: Option<String>,
}

impl From<NpsnLookup> for NpsnVerification {
    fn from(lookup: NpsnLookup) -> Self {
        Self {
            npsn: lookup.npsn.to_string(),
            verified: lookup.verified,
            name: lookup.name,
        }
    }
}

/// Look an NPSN up in the registry. Any lookup failure, or an API without a
/// configured client, yields an unverified result instead of an error.
pub(crate) async fn lookup_npsn(state: &AppState, npsn: &Npsn) -> NpsnLookup {
    let Some(client) = &state.npsn_client else {
        return NpsnLookup::unverified(npsn.clone());
    };
    match client.lookup(npsn).await {
        Ok(lookup) => lookup,
        Err(e) => {
            tracing::warn!(npsn = %npsn, error = %e, "NPSN lookup failed; treating as unverified");
            NpsnLookup::unverified(npsn.clone())
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/schools", get(list_schools))
        .route("/api/schools/me", get(get_my_profile).put(update_my_profile))
        .route("/api/schools/{id}", get(get_school))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/schools/verify-npsn", get(verify_npsn))
}

/// GET /api/schools/me
#[utoipa::path(
    get,
    path = "/api/schools/me",
    responses(
        (status = 200, description = "Caller's school profile", body = SchoolProfile),
        (status = 403, description = "Not a school session", body = crate::error::ErrorBody),
    ),
    tag = "schools"
)]
pub async fn get_my_profile(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SchoolProfile>, AppError> {
    let school_id = caller.require_school()?;
    state
        .schools
        .get(&school_id)
        .map(|s| Json(SchoolProfile::from(&s)))
        .ok_or_else(|| AppError::NotFound(format!("school {school_id} not found")))
}

/// PUT /api/schools/me
#[utoipa::path(
    put,
    path = "/api/schools/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = SchoolProfile),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "schools"
)]
pub async fn update_my_profile(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<SchoolProfile>, AppError> {
    let school_id = caller.require_school()?;
    let req = extract_validated_json(body)?;

    let (previous, updated) = state
        .schools
        .try_update(&school_id, |school| {
            let previous = school.clone();
            if let Some(name) = req.name {
                school.name = name.trim().to_string();
            }
            if let Some(phone) = req.phone {
                school.phone = non_blank(phone);
            }
            if let Some(address) = req.address {
                school.address = non_blank(address);
            }
            if let Some(principal) = req.principal_name {
                school.principal_name = non_blank(principal);
            }
            school.updated_at = Utc::now();
            Ok::<_, AppError>((previous, school.clone()))
        })
        .ok_or_else(|| AppError::NotFound(format!("school {school_id} not found")))??;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::schools::update(pool, &updated).await {
            state.schools.insert(school_id, previous);
            return Err(AppError::database("update school", e));
        }
    }

    if previous.name != updated.name {
        let renamed = state.campaigns.update_where(
            |c| c.school_id == school_id,
            |c| c.school_name = updated.name.clone(),
        );
        tracing::debug!(school_id = %school_id, campaigns = renamed, "campaign school name refreshed");
    }

    tracing::info!(school_id = %school_id, "school profile updated");
    Ok(Json(SchoolProfile::from(&updated)))
}

/// GET /api/schools: admin directory, newest first.
#[utoipa::path(
    get,
    path = "/api/schools",
    params(PaginationParams),
    responses(
        (status = 200, description = "Registered schools", body = Vec<SchoolProfile>),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
    ),
    tag = "schools"
)]
pub async fn list_schools(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<Vec<SchoolProfile>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let mut schools = state.schools.list();
    schools.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let page = pagination.page(schools);
    Ok(Json(page.iter().map(SchoolProfile::from).collect()))
}

/// GET /api/schools/{id}
#[utoipa::path(
    get,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 200, description = "School found", body = SchoolProfile),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "schools"
)]
pub async fn get_school(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<SchoolProfile>, AppError> {
    require_role(&caller, Role::Admin)?;
    state
        .schools
        .get(&id)
        .map(|s| Json(SchoolProfile::from(&s)))
        .ok_or_else(|| AppError::NotFound(format!("school {id} not found")))
}

/// GET /api/schools/verify-npsn?npsn=
#[utoipa::path(
    get,
    path = "/api/schools/verify-npsn",
    params(VerifyNpsnQuery),
    responses(
        (status = 200, description = "Lookup result", body = NpsnVerification),
        (status = 422, description = "Malformed NPSN", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "schools"
)]
pub async fn verify_npsn(
    State(state): State<AppState>,
    Query(query): Query<VerifyNpsnQuery>,
) -> Result<Json<NpsnVerification>, AppError> {
    let npsn = Npsn::new(&query.npsn)?;
    Ok(Json(lookup_npsn(&state, &npsn).await.into()))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
