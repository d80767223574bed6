//! # Fund-Usage Report API
//!
//! A school discloses how an approved proposal's funds were spent. Reports
//! start as drafts, are submitted for review, and are approved or rejected
//! by an admin. Approved reports are listed publicly on the campaign.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use edufund_core::Rupiah;
use edufund_state::{ProposalAction, ReportAction, ReportStatus, TransitionEvidence};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::proposals::DecisionRequest;
use super::StatusQuery;
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{check_len, check_url, extract_validated_json, require_text, Validate};
use crate::state::{AppState, ReportItem, ReportRecord};

const MAX_ITEMS: usize = 200;
const MAX_ATTACHMENTS: usize = 20;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportItemInput {
    pub description: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    pub proposal_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Total spent. Defaults to the sum of `items`.
    pub amount_used: Option<u64>,
    #[serde(default)]
    pub items: Vec<ReportItemInput>,
    /// URLs of receipts and photos, typically from `/api/upload`.
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReportRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount_used: Option<u64>,
    pub items: Option<Vec<ReportItemInput>>,
    pub attachments: Option<Vec<String>>,
}

fn validate_items(items: &[ReportItemInput]) -> Result<(), String> {
    if items.len() > MAX_ITEMS {
        return Err(format!("at most {MAX_ITEMS} items are allowed"));
    }
    for item in items {
        require_text("items.description", &item.description, 500)?;
    }
    Ok(())
}

fn validate_attachments(urls: &[String]) -> Result<(), String> {
    if urls.len() > MAX_ATTACHMENTS {
        return Err(format!("at most {MAX_ATTACHMENTS} attachments are allowed"));
    }
    urls.iter().try_for_each(|u| check_url("attachments", u))
}

impl Validate for CreateReportRequest {
    fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title, 200)?;
        check_len("description", &self.description, 10_000)?;
        validate_items(&self.items)?;
        validate_attachments(&self.attachments)
    }
}

impl Validate for UpdateReportRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            require_text("title", title, 200)?;
        }
        if let Some(description) = &self.description {
            check_len("description", description, 10_000)?;
        }
        if let Some(items) = &self.items {
            validate_items(items)?;
        }
        if let Some(urls) = &self.attachments {
            validate_attachments(urls)?;
        }
        Ok(())
    }
}

/// Line items and the declared total. A declared total must match the
/// items when both are given.
fn resolve_amounts(
    declared: Option<u64>,
    items: Vec<ReportItemInput>,
) -> Result<(Rupiah, Vec<ReportItem>), AppError> {
    let items: Vec<ReportItem> = items
        .into_iter()
        .map(|i| ReportItem {
            description: i.description.trim().to_string(),
            amount: Rupiah(i.amount),
        })
        .collect();
    let sum = items
        .iter()
        .try_fold(Rupiah::ZERO, |acc, i| acc.checked_add(i.amount))?;
    match declared {
        Some(total) if !items.is_empty() && Rupiah(total) != sum => Err(AppError::Validation(
            format!("amount_used ({total}) does not match the sum of items ({})", sum.value()),
        )),
        Some(total) => Ok((Rupiah(total), items)),
        None => Ok((sum, items)),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports", get(list_reports).post(create_report))
        .route("/api/reports/mine", get(list_my_reports))
        .route(
            "/api/reports/{id}",
            get(get_report).put(update_report).delete(delete_report),
        )
        .route("/api/reports/{id}/submit", post(submit_report))
        .route("/api/reports/{id}/decision", post(review_report))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("report {id} not found"))
}

async fn persist_update(
    state: &AppState,
    previous: ReportRecord,
    updated: &ReportRecord,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::reports::update(pool, updated).await {
            state.reports.insert(previous.id, previous);
            return Err(AppError::database("update report", e));
        }
    }
    Ok(())
}

/// POST /api/reports: draft a report for one of the caller's approved
/// proposals.
#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Draft created", body = ReportRecord),
        (status = 404, description = "Proposal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal is not approved", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn create_report(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReportRecord>), AppError> {
    let school_id = caller.require_school()?;
    let req = extract_validated_json(body)?;

    let proposal = state
        .proposals
        .get(&req.proposal_id)
        .filter(|p| p.school_id == school_id)
        .ok_or_else(|| AppError::NotFound(format!("proposal {} not found", req.proposal_id)))?;
    proposal.status.require(ProposalAction::AttachReport)?;

    let (amount_used, items) = resolve_amounts(req.amount_used, req.items)?;
    let now = Utc::now();
    let record = ReportRecord {
        id: Uuid::new_v4(),
        school_id,
        proposal_id: proposal.id,
        title: req.title.trim().to_string(),
        description: req.description,
        amount_used,
        items,
        attachments: req.attachments,
        status: ReportStatus::Draft,
        transitions: Vec::new(),
        review_note: None,
        created_at: now,
        updated_at: now,
    };

    state.reports.insert(record.id, record.clone());
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::reports::insert(pool, &record).await {
            state.reports.remove(&record.id);
            return Err(AppError::database("insert report", e));
        }
    }

    tracing::info!(report_id = %record.id, proposal_id = %proposal.id, "report drafted");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/reports/mine
#[utoipa::path(
    get,
    path = "/api/reports/mine",
    params(StatusQuery),
    responses(
        (status = 200, description = "Caller's reports", body = Vec<ReportRecord>),
    ),
    tag = "reports"
)]
pub async fn list_my_reports(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<ReportRecord>>, AppError> {
    let school_id = caller.require_school()?;
    let status = parse_status(query.status.as_deref())?;
    let mut reports = state
        .reports
        .filter(|r| r.school_id == school_id && status.map_or(true, |s| r.status == s));
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(query.pagination().page(reports)))
}

/// GET /api/reports: admin review queue, oldest first.
#[utoipa::path(
    get,
    path = "/api/reports",
    params(StatusQuery),
    responses(
        (status = 200, description = "All reports", body = Vec<ReportRecord>),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn list_reports(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<ReportRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let status = parse_status(query.status.as_deref())?;
    let mut reports = state.reports.filter(|r| status.map_or(true, |s| r.status == s));
    reports.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
    Ok(Json(query.pagination().page(reports)))
}

/// GET /api/reports/{id}
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report found", body = ReportRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportRecord>, AppError> {
    state
        .reports
        .get(&id)
        .filter(|r| caller.can_read(r.school_id))
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PUT /api/reports/{id}: edit a draft.
#[utoipa::path(
    put,
    path = "/api/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateReportRequest,
    responses(
        (status = 200, description = "Draft updated", body = ReportRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Report is no longer a draft", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn update_report(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> Result<Json<ReportRecord>, AppError> {
    let school_id = caller.require_school()?;
    let req = extract_validated_json(body)?;

    let (previous, updated) = state
        .reports
        .try_update(&id, |r| {
            if r.school_id != school_id {
                return Err(not_found(id));
            }
            r.status.require(ReportAction::Edit)?;

            let (amount_used, items) = match req.items {
                Some(items) => resolve_amounts(req.amount_used, items)?,
                None => {
                    let current = r
                        .items
                        .iter()
                        .map(|i| ReportItemInput {
                            description: i.description.clone(),
                            amount: i.amount.value(),
                        })
                        .collect();
                    resolve_amounts(req.amount_used.or(Some(r.amount_used.value())), current)?
                }
            };

            let previous = r.clone();
            if let Some(title) = req.title {
                r.title = title.trim().to_string();
            }
            if let Some(description) = req.description {
                r.description = description;
            }
            if let Some(attachments) = req.attachments {
                r.attachments = attachments;
            }
            r.amount_used = amount_used;
            r.items = items;
            r.updated_at = Utc::now();
            Ok::<_, AppError>((previous, r.clone()))
        })
        .ok_or_else(|| not_found(id))??;

    persist_update(&state, previous, &updated).await?;
    Ok(Json(updated))
}

/// DELETE /api/reports/{id}: delete a draft.
#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 204, description = "Draft deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Report is no longer a draft", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn delete_report(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let school_id = caller.require_school()?;

    let removed = state
        .reports
        .remove_if(&id, |r| {
            if r.school_id != school_id {
                return Err(not_found(id));
            }
            r.status.require(ReportAction::Delete).map_err(AppError::from)
        })
        .ok_or_else(|| not_found(id))??;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::reports::delete(pool, id).await {
            state.reports.insert(id, removed);
            return Err(AppError::database("delete report", e));
        }
    }

    tracing::info!(report_id = %id, "draft report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/reports/{id}/submit: DRAFT → SUBMITTED.
#[utoipa::path(
    post,
    path = "/api/reports/{id}/submit",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Submitted for review", body = ReportRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not a draft", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn submit_report(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportRecord>, AppError> {
    let school_id = caller.require_school()?;
    let evidence = TransitionEvidence::new(caller.subject.clone());

    let (previous, updated) = state
        .reports
        .try_update(&id, |r| {
            if r.school_id != school_id {
                return Err(not_found(id));
            }
            r.status.require(ReportAction::Submit)?;
            let record = r.status.submit(&evidence)?;
            let previous = r.clone();
            r.apply(record);
            Ok::<_, AppError>((previous, r.clone()))
        })
        .ok_or_else(|| not_found(id))??;

    persist_update(&state, previous, &updated).await?;
    tracing::info!(report_id = %id, "report submitted");
    Ok(Json(updated))
}

/// POST /api/reports/{id}/decision: SUBMITTED → APPROVED | REJECTED.
#[utoipa::path(
    post,
    path = "/api/reports/{id}/decision",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Review recorded", body = ReportRecord),
        (status = 403, description = "Admin only", body = crate::error::ErrorBody),
        (status = 409, description = "Report is not submitted", body = crate::error::ErrorBody),
    ),
    tag = "reports"
)]
pub async fn review_report(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<ReportRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let evidence = TransitionEvidence::new(caller.subject.clone()).with_reason(req.note);

    let (previous, updated) = state
        .reports
        .try_update(&id, |r| {
            r.status.require(ReportAction::Review)?;
            let record = r.status.review(req.decision, &evidence)?;
            let previous = r.clone();
            r.apply(record);
            r.review_note = evidence.reason.clone();
            Ok::<_, AppError>((previous, r.clone()))
        })
        .ok_or_else(|| not_found(id))??;

    persist_update(&state, previous, &updated).await?;
    tracing::info!(
        report_id = %id,
        decision = %req.decision,
        admin = %caller.subject,
        "report reviewed"
    );
    Ok(Json(updated))
}

fn parse_status(raw: Option<&str>) -> Result<Option<ReportStatus>, AppError> {
    raw.map(str::parse::<ReportStatus>)
        .transpose()
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, amount: u64) -> ReportItemInput {
        ReportItemInput {
            description: description.into(),
            amount,
        }
    }

    #[test]
    fn amount_defaults_to_item_sum() {
        let (total, items) =
            resolve_amounts(None, vec![item("Semen", 400_000), item("Genteng", 850_000)]).unwrap();
        assert_eq!(total, Rupiah(1_250_000));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn declared_amount_must_match_items() {
        let err = resolve_amounts(Some(1_000), vec![item("Cat", 2_000)]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let (total, _) = resolve_amounts(Some(2_000), vec![item("Cat", 2_000)]).unwrap();
        assert_eq!(total, Rupiah(2_000));
    }

    #[test]
    fn declared_amount_without_items() {
        let (total, items) = resolve_amounts(Some(500_000), Vec::new()).unwrap();
        assert_eq!(total, Rupiah(500_000));
        assert!(items.is_empty());
    }

    #[test]
    fn attachment_limits() {
        assert!(validate_attachments(&["/uploads/a.png".to_string()]).is_ok());
        assert!(validate_attachments(&["data:xyz".to_string()]).is_err());
        let many = vec!["/uploads/a.png".to_string(); MAX_ATTACHMENTS + 1];
        assert!(validate_attachments(&many).is_err());
    }
}
