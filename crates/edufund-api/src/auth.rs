//! # Authentication & Authorization
//!
//! Session tokens are HS256 JWTs signed with the configured session secret.
//! Each token carries a session id (`sid`) that must also exist in the
//! server-side session store, so logout revokes a token immediately even
//! though its signature and expiry are still valid.
//!
//! ```text
//! Authorization: Bearer <jwt{sub, role, sid, school_id?, iat, exp}>
//! ```
//!
//! The [`auth_middleware`] validates signature, expiry, and the live session,
//! then injects a [`CallerIdentity`] into request extensions for handlers.
//!
//! Passwords (school accounts and the configured admin) are stored as
//! argon2id PHC strings.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, SessionRecord};

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles ordered by privilege: `School < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages its own profile, proposals, reports, and timeline.
    School,
    /// Moderates proposals and reports, reads everything.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::School => "school",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// Set for school sessions.
    pub school_id: Option<Uuid>,
    /// `school:<uuid>` or `admin:<username>`.
    pub subject: String,
    pub session_id: Uuid,
}

impl CallerIdentity {
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// The caller's school id. Admin sessions have none and get 403.
    pub fn require_school(&self) -> Result<Uuid, AppError> {
        match (self.role, self.school_id) {
            (Role::School, Some(id)) => Ok(id),
            _ => Err(AppError::Forbidden(
                "this endpoint is only available to school accounts".into(),
            )),
        }
    }

    /// Owners and admins may read a school-owned resource.
    pub fn can_read(&self, owner: Uuid) -> bool {
        self.role == Role::Admin || self.school_id == Some(owner)
    }
}

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// 403 unless the caller has at least `minimum`.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Session tokens ──────────────────────────────────────────────────────────

/// JWT claims for a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub sid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

/// Keys and lifetime for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("keys", &"[REDACTED]")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        // Capped at ten years; chrono rejects durations near i64::MAX ms.
        let ttl_secs = i64::try_from(ttl_secs.min(10 * 365 * 24 * 60 * 60)).unwrap_or(0);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))
    }

    /// Verify signature and expiry. No leeway: an expired token is expired.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

/// A freshly issued session, returned by the login endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedSession {
    pub token: String,
    pub token_type: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Create a session record and sign its token.
pub fn issue_session(
    state: &AppState,
    subject: String,
    role: Role,
    school_id: Option<Uuid>,
) -> Result<IssuedSession, AppError> {
    let now = Utc::now();
    let expires_at = now + state.session_keys.ttl();

    // Opportunistic cleanup so the session table stays bounded.
    let purged = state.sessions.retain(|s| s.expires_at > now);
    if purged > 0 {
        tracing::debug!(purged, "purged expired sessions");
    }

    let record = SessionRecord {
        id: Uuid::new_v4(),
        subject: subject.clone(),
        role,
        school_id,
        issued_at: now,
        expires_at,
    };
    let claims = Claims {
        sub: subject,
        role,
        sid: record.id,
        school_id,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = state.session_keys.sign(&claims)?;
    state.sessions.insert(record.id, record);

    Ok(IssuedSession {
        token,
        token_type: "Bearer".to_string(),
        role,
        expires_at,
    })
}

/// Resolve a bearer token to a caller identity.
pub fn authenticate(state: &AppState, token: &str) -> Result<CallerIdentity, String> {
    let claims = state
        .session_keys
        .verify(token)
        .map_err(|e| format!("invalid session token: {e}"))?;

    let session = state
        .sessions
        .get(&claims.sid)
        .ok_or_else(|| "session revoked or expired".to_string())?;
    if session.expires_at <= Utc::now() {
        state.sessions.remove(&session.id);
        return Err("session revoked or expired".to_string());
    }
    if session.subject != claims.sub || session.role != claims.role {
        return Err("session does not match token".to_string());
    }

    Ok(CallerIdentity {
        role: session.role,
        school_id: session.school_id,
        subject: session.subject,
        session_id: session.id,
    })
}

// ── Passwords ───────────────────────────────────────────────────────────────

/// Hash a password as an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "stored password hash is not a valid PHC string");
            false
        }
    }
}

/// Constant-time username comparison for the admin credential.
pub fn username_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Require a valid session on every request passing through this layer.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(value) if value.starts_with("Bearer ") => value["Bearer ".len()..].trim(),
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            return AppError::Unauthorized("authorization header must use Bearer scheme".into())
                .into_response();
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return AppError::Unauthorized("missing authorization header".into()).into_response();
        }
    };

    match authenticate(&state, token) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(reason) => {
            tracing::warn!(reason = %reason, "authentication failed");
            AppError::Unauthorized(reason).into_response()
        }
    }
}
