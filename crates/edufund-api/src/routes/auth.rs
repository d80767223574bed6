//! # Authentication API
//!
//! School registration and login, admin login against the configured
//! credential, logout (server-side revocation), and `me`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use edufund_core::{Email, Npsn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::schools::{lookup_npsn, SchoolProfile};
use crate::auth::{
    hash_password, issue_session, username_matches, verify_password, CallerIdentity,
    IssuedSession, Role,
};
use crate::error::AppError;
use crate::extractors::{check_len, extract_json, extract_validated_json, require_text, Validate};
use crate::state::{AppState, SchoolRecord};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    /// 8-digit national school registry number.
    pub npsn: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub principal_name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name, 200)?;
        Npsn::new(&self.npsn).map_err(|e| e.to_string())?;
        Email::new(&self.email).map_err(|e| e.to_string())?;
        let len = self.password.chars().count();
        if len < MIN_PASSWORD_LEN {
            return Err(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        if len > MAX_PASSWORD_LEN {
            return Err(format!(
                "password must not exceed {MAX_PASSWORD_LEN} characters"
            ));
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

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by registration and both login endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub session: IssuedSession,
    /// Present for school sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<SchoolProfile>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub role: Role,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<SchoolProfile>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/admin/login", post(admin_login))
}

/// POST /api/auth/register
///
/// The NPSN is checked against the registry; a failed or unavailable lookup
/// registers the school as unverified rather than rejecting it.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "School registered and signed in", body = AuthResponse),
        (status = 409, description = "Email or NPSN already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let npsn = Npsn::new(&req.npsn)?;
    let email = Email::new(&req.email)?;

    let lookup = lookup_npsn(&state, &npsn).await;
    let password_hash = hash_password(&req.password)?;

    let now = Utc::now();
    let record = SchoolRecord {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        npsn,
        email,
        password_hash,
        npsn_verified: lookup.verified,
        registry_name: lookup.name,
        phone: req.phone.filter(|s| !s.trim().is_empty()),
        address: req.address.filter(|s| !s.trim().is_empty()),
        principal_name: req.principal_name.filter(|s| !s.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };

    state
        .schools
        .insert_unless(record.id, record.clone(), |existing| {
            if existing.email == record.email {
                Some(AppError::Conflict("email is already registered".into()))
            } else if existing.npsn == record.npsn {
                Some(AppError::Conflict("NPSN is already registered".into()))
            } else {
                None
            }
        })?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::schools::insert(pool, &record).await {
            state.schools.remove(&record.id);
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return Err(AppError::Conflict(
                        "email or NPSN is already registered".into(),
                    ));
                }
            }
            return Err(AppError::database("insert school", e));
        }
    }

    tracing::info!(
        school_id = %record.id,
        npsn = %record.npsn,
        npsn_verified = record.npsn_verified,
        "school registered"
    );

    let session = issue_session(
        &state,
        format!("school:{}", record.id),
        Role::School,
        Some(record.id),
    )?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            session,
            school: Some(SchoolProfile::from(&record)),
        }),
    ))
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let req = extract_json(body)?;
    let invalid = || AppError::Unauthorized("invalid email or password".into());

    let email = Email::new(&req.email).map_err(|_| invalid())?;
    let school = state
        .schools
        .find(|s| s.email == email)
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &school.password_hash) {
        tracing::warn!(school_id = %school.id, "school login failed");
        return Err(invalid());
    }

    let session = issue_session(
        &state,
        format!("school:{}", school.id),
        Role::School,
        Some(school.id),
    )?;
    tracing::info!(school_id = %school.id, "school signed in");
    Ok(Json(AuthResponse {
        session,
        school: Some(SchoolProfile::from(&school)),
    }))
}

/// POST /api/auth/admin/login
#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
        (status = 503, description = "Admin login not configured", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "auth"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    body: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let req = extract_json(body)?;
    let admin = state
        .config
        .admin
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("admin login is not configured".into()))?;

    let user_ok = username_matches(&req.username, &admin.username);
    let password_ok = verify_password(&req.password, &admin.password_hash);
    if !(user_ok && password_ok) {
        tracing::warn!("admin login failed");
        return Err(AppError::Unauthorized("invalid username or password".into()));
    }

    let session = issue_session(&state, format!("admin:{}", admin.username), Role::Admin, None)?;
    tracing::info!(admin = %admin.username, "admin signed in");
    Ok(Json(AuthResponse {
        session,
        school: None,
    }))
}

/// POST /api/auth/logout: revoke the caller's session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, caller: CallerIdentity) -> StatusCode {
    state.sessions.remove(&caller.session_id);
    tracing::info!(subject = %caller.subject, "session revoked");
    StatusCode::NO_CONTENT
}

/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Caller identity", body = MeResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, caller: CallerIdentity) -> Json<MeResponse> {
    let school = caller
        .school_id
        .and_then(|id| state.schools.get(&id))
        .map(|s| SchoolProfile::from(&s));
    Json(MeResponse {
        role: caller.role,
        subject: caller.subject,
        school,
    })
}
