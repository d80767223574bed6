//! # Activity Timeline API
//!
//! Dated activity entries (with photos) that a school posts on its approved
//! proposals. Entries are immutable; the owner may delete them.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use edufund_state::ProposalAction;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{check_len, check_url, extract_validated_json, require_text, Validate};
use crate::state::{AppState, TimelineEntryRecord};

const MAX_IMAGES: usize = 20;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTimelineEntryRequest {
    pub proposal_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub activity_date: NaiveDate,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Validate for CreateTimelineEntryRequest {
    fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title, 200)?;
        check_len("description", &self.description, 5_000)?;
        if self.images.len() > MAX_IMAGES {
            return Err(format!("at most {MAX_IMAGES} images are allowed"));
        }
        self.images.iter().try_for_each(|u| check_url("images", u))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TimelineQuery {
    /// Only entries for this proposal.
    pub proposal_id: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/timeline", get(list_my_entries).post(create_entry))
        .route("/api/timeline/{id}", delete(delete_entry))
}

/// Newest activity first; entries on the same day by creation time.
pub(crate) fn sort_newest_first(entries: &mut [TimelineEntryRecord]) {
    entries.sort_by(|a, b| {
        b.activity_date
            .cmp(&a.activity_date)
            .then(b.created_at.cmp(&a.created_at))
    });
}

/// POST /api/timeline
#[utoipa::path(
    post,
    path = "/api/timeline",
    request_body = CreateTimelineEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = TimelineEntryRecord),
        (status = 404, description = "Proposal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal is not approved", body = crate::error::ErrorBody),
    ),
    tag = "timeline"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateTimelineEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TimelineEntryRecord>), AppError> {
    let school_id = caller.require_school()?;
    let req = extract_validated_json(body)?;

    let proposal = state
        .proposals
        .get(&req.proposal_id)
        .filter(|p| p.school_id == school_id)
        .ok_or_else(|| AppError::NotFound(format!("proposal {} not found", req.proposal_id)))?;
    proposal.status.require(ProposalAction::AddTimelineEntry)?;

    let record = TimelineEntryRecord {
        id: Uuid::new_v4(),
        school_id,
        proposal_id: proposal.id,
        title: req.title.trim().to_string(),
        description: req.description,
        activity_date: req.activity_date,
        images: req.images,
        created_at: Utc::now(),
    };

    state.timeline.insert(record.id, record.clone());
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::timeline::insert(pool, &record).await {
            state.timeline.remove(&record.id);
            return Err(AppError::database("insert timeline entry", e));
        }
    }

    tracing::info!(entry_id = %record.id, proposal_id = %proposal.id, "timeline entry added");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/timeline
#[utoipa::path(
    get,
    path = "/api/timeline",
    params(TimelineQuery),
    responses(
        (status = 200, description = "Caller's timeline entries", body = Vec<TimelineEntryRecord>),
    ),
    tag = "timeline"
)]
pub async fn list_my_entries(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Vec<TimelineEntryRecord>>, AppError> {
    let school_id = caller.require_school()?;
    let mut entries = state.timeline.filter(|e| {
        e.school_id == school_id && query.proposal_id.map_or(true, |p| e.proposal_id == p)
    });
    sort_newest_first(&mut entries);
    Ok(Json(entries))
}

/// DELETE /api/timeline/{id}
#[utoipa::path(
    delete,
    path = "/api/timeline/{id}",
    params(("id" = Uuid, Path, description = "Timeline entry ID")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "timeline"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let school_id = caller.require_school()?;
    let not_found = || AppError::NotFound(format!("timeline entry {id} not found"));

    let removed = state
        .timeline
        .remove_if(&id, |e| {
            if e.school_id == school_id {
                Ok(())
            } else {
                Err(not_found())
            }
        })
        .ok_or_else(not_found)??;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::timeline::delete(pool, id).await {
            state.timeline.insert(id, removed);
            return Err(AppError::database("delete timeline entry", e));
        }
    }

    tracing::info!(entry_id = %id, "timeline entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
