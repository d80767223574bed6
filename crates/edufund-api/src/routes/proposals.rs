//! # Proposal API
//!
//! Schools draft, edit, and submit funding proposals; admins approve or
//! reject them. Every status-dependent check goes through
//! [`ProposalStatus::require`], and every transition through the
//! `edufund-state` machine, which appends a transition record.
//!
//! Approval creates the donor-facing campaign with the proposal's id. With
//! persistence enabled both writes commit in one transaction.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use edufund_core::Rupiah;
use edufund_state::{
    check_submittable, Decision, ProposalAction, ProposalStatus, TransitionEvidence,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::StatusQuery;
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{check_len, check_url, extract_validated_json, require_text, Validate};
use crate::state::{AppState, CampaignRecord, ProposalRecord};

const MAX_TITLE: usize = 200;
const MAX_DESCRIPTION: usize = 10_000;
const MAX_CATEGORY: usize = 64;
const MAX_NOTE: usize = 2_000;

/// New draft. Drafts may be incomplete; completeness is checked on submit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProposalRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Target in whole Rupiah.
    #[serde(default)]
    pub target_amount: u64,
    pub deadline: Option<NaiveDate>,
    pub cover_image_url: Option<String>,
}

impl Validate for CreateProposalRequest {
    fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title, MAX_TITLE)?;
        check_len("description", &self.description, MAX_DESCRIPTION)?;
        check_len("category", &self.category, MAX_CATEGORY)?;
        if let Some(url) = &self.cover_image_url {
            check_url("cover_image_url", url)?;
        }
        Ok(())
    }
}

/// Draft edit. Absent fields are left unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProposalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_amount: Option<u64>,
    pub deadline: Option<NaiveDate>,
    pub cover_image_url: Option<String>,
}

impl Validate for UpdateProposalRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            require_text("title", title, MAX_TITLE)?;
        }
        if let Some(description) = &self.description {
            check_len("description", description, MAX_DESCRIPTION)?;
        }
        if let Some(category) = &self.category {
            check_len("category", category, MAX_CATEGORY)?;
        }
        if let Some(url) = &self.cover_image_url {
            check_url("cover_image_url", url)?;
        }
        Ok(())
    }
}

/// Admin moderation decision, shared with report review.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// `approve` or `reject`.
    #[schema(value_type = String)]
    pub decision: Decision,
    pub note: Option<String>,
}

impl Validate for DecisionRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(note) = &self.note {
            check_len("note", note, MAX_NOTE)?;
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/proposals", get(list_proposals).post(create_proposal))
        .route("/api/proposals/mine", get(list_my_proposals))
        .route(
            "/api/proposals/{id}",
            get(get_proposal).put(update_proposal).delete(delete_proposal),
        )
        .route("/api/proposals/{id}/submit", post(submit_proposal))
        .route("/api/proposals/{id}/decision", post(decide_proposal))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("proposal {id} not found"))
}

/// Fetch a proposal the caller may read. Other schools' proposals are
/// reported as missing.
fn readable(state: &AppState, caller: &CallerIdentity, id: Uuid) -> Result<ProposalRecord, AppError> {
    state
        .proposals
        .get(&id)
        .filter(|p| caller.can_read(p.school_id))
        .ok_or_else(|| not_found(id))
}

/// Write an updated proposal through to the database, restoring `previous`
/// in memory if the write fails.
async fn persist_update(
    state: &AppState,
    previous: ProposalRecord,
    updated: &ProposalRecord,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::proposals::update(pool, updated).await {
            state.proposals.insert(previous.id, previous);
            return Err(AppError::database("update proposal", e));
        }
    }
    Ok(())
}

/// POST /api/proposals
#[utoipa::path(
    post,
    path = "/api/proposals",
    request_body = CreateProposalRequest,
    responses(
        (status = 201, description = "Draft created", body = ProposalRecord),
        (status = 403, description = "Not a school session", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn create_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateProposalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProposalRecord>), AppError> {
    let school_id = caller.require_school()?;
    let req = extract_validated_json(body)?;

    let now = Utc::now();
    let record = ProposalRecord {
        id: Uuid::new_v4(),
        school_id,
        title: req.title.trim().to_string(),
        description: req.description,
        category: req.category.trim().to_string(),
        target_amount: Rupiah(req.target_amount),
        deadline: req.deadline,
        cover_image_url: req.cover_image_url,
        status: ProposalStatus::Draft,
        transitions: Vec::new(),
        decision_note: None,
        created_at: now,
        updated_at: now,
    };

    state.proposals.insert(record.id, record.clone());
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::proposals::insert(pool, &record).await {
            state.proposals.remove(&record.id);
            return Err(AppError::database("insert proposal", e));
        }
    }

    tracing::info!(proposal_id = %record.id, school_id = %school_id, "proposal drafted");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/proposals/mine: the caller's proposals, newest first.
#[utoipa::path(
    get,
    path = "/api/proposals/mine",
    params(StatusQuery),
    responses(
        (status = 200, description = "Caller's proposals", body = Vec<ProposalRecord>),
        (status = 400, description = "Unknown status", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn list_my_proposals(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<ProposalRecord>>, AppError> {
    let school_id = caller.require_school()?;
    let status = parse_status(query.status.as_deref())?;
    let mut proposals = state
        .proposals
        .filter(|p| p.school_id == school_id && status.map_or(true, |s| p.status == s));
    proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(query.pagination().page(proposals)))
}

/// GET /api/proposals: admin moderation queue, oldest first.
#[utoipa::path(
    get,
    path = "/api/proposals",
    params(StatusQuery),
    responses(
        (status = 200, description = "All proposals", body = Vec<ProposalRecord>),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn list_proposals(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<ProposalRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let status = parse_status(query.status.as_deref())?;
    let mut proposals = state
        .proposals
        .filter(|p| status.map_or(true, |s| p.status == s));
    proposals.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
    Ok(Json(query.pagination().page(proposals)))
}

/// GET /api/proposals/{id}
#[utoipa::path(
    get,
    path = "/api/proposals/{id}",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 200, description = "Proposal found", body = ProposalRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn get_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalRecord>, AppError> {
    readable(&state, &caller, id).map(Json)
}

/// PUT /api/proposals/{id}: edit a draft.
#[utoipa::path(
    put,
    path = "/api/proposals/{id}",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    request_body = UpdateProposalRequest,
    responses(
        (status = 200, description = "Draft updated", body = ProposalRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal is no longer a draft", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn update_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateProposalRequest>, JsonRejection>,
) -> Result<Json<ProposalRecord>, AppError> {
    let school_id = caller.require_school()?;
    let req = extract_validated_json(body)?;

    let (previous, updated) = state
        .proposals
        .try_update(&id, |p| {
            if p.school_id != school_id {
                return Err(not_found(id));
            }
            p.status.require(ProposalAction::Edit)?;
            let previous = p.clone();
            if let Some(title) = req.title {
                p.title = title.trim().to_string();
            }
            if let Some(description) = req.description {
                p.description = description;
            }
            if let Some(category) = req.category {
                p.category = category.trim().to_string();
            }
            if let Some(target) = req.target_amount {
                p.target_amount = Rupiah(target);
            }
            if req.deadline.is_some() {
                p.deadline = req.deadline;
            }
            if req.cover_image_url.is_some() {
                p.cover_image_url = req.cover_image_url;
            }
            p.updated_at = Utc::now();
            Ok::<_, AppError>((previous, p.clone()))
        })
        .ok_or_else(|| not_found(id))??;

    persist_update(&state, previous, &updated).await?;
    Ok(Json(updated))
}

/// DELETE /api/proposals/{id}: delete a draft.
#[utoipa::path(
    delete,
    path = "/api/proposals/{id}",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 204, description = "Draft deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal is no longer a draft", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn delete_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let school_id = caller.require_school()?;

    let removed = state
        .proposals
        .remove_if(&id, |p| {
            if p.school_id != school_id {
                return Err(not_found(id));
            }
            p.status.require(ProposalAction::Delete).map_err(AppError::from)
        })
        .ok_or_else(|| not_found(id))??;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::proposals::delete(pool, id).await {
            state.proposals.insert(id, removed);
            return Err(AppError::database("delete proposal", e));
        }
    }

    tracing::info!(proposal_id = %id, "draft proposal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/proposals/{id}/submit: DRAFT → PENDING.
#[utoipa::path(
    post,
    path = "/api/proposals/{id}/submit",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 200, description = "Submitted for review", body = ProposalRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not a draft", body = crate::error::ErrorBody),
        (status = 422, description = "Required fields missing", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn submit_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalRecord>, AppError> {
    let school_id = caller.require_school()?;
    let evidence = TransitionEvidence::new(caller.subject.clone());

    let (previous, updated) = state
        .proposals
        .try_update(&id, |p| {
            if p.school_id != school_id {
                return Err(not_found(id));
            }
            p.status.require(ProposalAction::Submit)?;
            check_submittable(&p.title, &p.description, p.target_amount)?;
            let record = p.status.submit(&evidence)?;
            let previous = p.clone();
            p.apply(record);
            Ok::<_, AppError>((previous, p.clone()))
        })
        .ok_or_else(|| not_found(id))??;

    persist_update(&state, previous, &updated).await?;
    tracing::info!(proposal_id = %id, school_id = %school_id, "proposal submitted");
    Ok(Json(updated))
}

/// POST /api/proposals/{id}/decision: PENDING → APPROVED | REJECTED.
#[utoipa::path(
    post,
    path = "/api/proposals/{id}/decision",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ProposalRecord),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal is not pending", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn decide_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<ProposalRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let evidence = TransitionEvidence::new(caller.subject.clone()).with_reason(req.note.clone());

    let (previous, updated) = state
        .proposals
        .try_update(&id, |p| {
            p.status.require(ProposalAction::Decide)?;
            let record = p.status.decide(req.decision, &evidence)?;
            let previous = p.clone();
            p.apply(record);
            p.decision_note = evidence.reason.clone();
            Ok::<_, AppError>((previous, p.clone()))
        })
        .ok_or_else(|| not_found(id))??;

    if updated.status == ProposalStatus::Approved {
        let school_name = state
            .schools
            .get(&updated.school_id)
            .map(|s| s.name)
            .unwrap_or_default();
        let campaign = CampaignRecord::from_proposal(&updated, school_name);
        state.campaigns.insert(campaign.id, campaign.clone());

        if let Some(pool) = &state.db_pool {
            if let Err(e) =
                crate::db::proposals::approve_with_campaign(pool, &updated, &campaign).await
            {
                state.campaigns.remove(&campaign.id);
                state.proposals.insert(id, previous);
                return Err(AppError::database("approve proposal", e));
            }
        }
    } else {
        persist_update(&state, previous, &updated).await?;
    }

    tracing::info!(
        proposal_id = %id,
        decision = %req.decision,
        admin = %caller.subject,
        "proposal decided"
    );
    Ok(Json(updated))
}

fn parse_status(raw: Option<&str>) -> Result<Option<ProposalStatus>, AppError> {
    raw.map(str::parse::<ProposalStatus>)
        .transpose()
        .map_err(AppError::from)
}
