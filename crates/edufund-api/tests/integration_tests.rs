//! # Lifecycle Integration Tests
//!
//! Drives the assembled router end to end: school ownership, proposal
//! submission and moderation, the report lifecycle, the approval gate on
//! reports and timeline entries, uploads, dashboards, and donation
//! accounting under concurrency.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use edufund_api::auth::{hash_password, issue_session, Role};
use edufund_api::config::{AdminCredential, AppConfig};
use edufund_api::state::{AppState, SchoolRecord};
use edufund_core::{Email, Npsn};
use zeroize::Zeroizing;

struct Harness {
    app: axum::Router,
    state: AppState,
    _uploads: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with(|_| {})
}

fn harness_with(configure: impl FnOnce(&mut AppConfig)) -> Harness {
    let uploads = tempfile::tempdir().unwrap();
    let mut config = AppConfig {
        upload_dir: uploads.path().to_path_buf(),
        ..Default::default()
    };
    configure(&mut config);
    let state = AppState::with_config(config, None, None);
    Harness {
        app: edufund_api::app(state.clone()),
        state,
        _uploads: uploads,
    }
}

/// Insert a school directly and return its id and a bearer token.
fn seed_school(state: &AppState, npsn: &str) -> (Uuid, String) {
    let now = Utc::now();
    let record = SchoolRecord {
        id: Uuid::new_v4(),
        name: format!("SD Negeri {npsn}"),
        npsn: Npsn::new(npsn).unwrap(),
        email: Email::new(format!("{npsn}@sekolah.example")).unwrap(),
        password_hash: String::new(),
        npsn_verified: false,
        registry_name: None,
        phone: None,
        address: None,
        principal_name: None,
        created_at: now,
        updated_at: now,
    };
    let id = record.id;
    state.schools.insert(id, record);
    let session = issue_session(state, format!("school:{id}"), Role::School, Some(id)).unwrap();
    (id, session.token)
}

fn admin_token(state: &AppState) -> String {
    issue_session(state, "admin:admin".into(), Role::Admin, None)
        .unwrap()
        .token
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn timestamp(body: &Value, field: &str) -> DateTime<Utc> {
    body[field].as_str().unwrap().parse().unwrap()
}

async fn create_draft(app: &axum::Router, token: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/proposals",
            Some(token),
            Some(json!({
                "title": "Renovasi perpustakaan",
                "description": "Rak buku baru dan meja baca",
                "category": "infrastruktur",
                "target_amount": 50_000_000u64
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "draft");
    body["id"].as_str().unwrap().to_string()
}

async fn approved_proposal(h: &Harness, token: &str) -> String {
    let id = create_draft(&h.app, token).await;
    let (status, _) = send(
        &h.app,
        request("POST", &format!("/api/proposals/{id}/submit"), Some(token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let admin = admin_token(&h.state);
    let (status, body) = send(
        &h.app,
        request(
            "POST",
            &format!("/api/proposals/{id}/decision"),
            Some(&admin),
            Some(json!({"decision": "approve", "note": "lengkap"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "approved");
    id
}

// ── Accounts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn register_then_login_then_logout() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "SMP Harapan",
                "npsn": "20100001",
                "email": "Admin@SMPHarapan.example",
                "password": "rahasia-123"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["school"]["npsn_verified"], false);

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "SMP Lain",
                "npsn": "20100001",
                "email": "lain@smp.example",
                "password": "rahasia-123"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &h.app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "admin@smpharapan.example", "password": "rahasia-123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["session"]["token"].as_str().unwrap().to_string();

    let (status, me) = send(&h.app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "school");

    let (status, _) = send(&h.app, request("POST", "/api/auth/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&h.app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "nobody@sekolah.example", "password": "whatever-1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Proposals ────────────────────────────────────────────────────────

#[tokio::test]
async fn drafts_are_private_to_their_school() {
    let h = harness();
    let (_, token_a) = seed_school(&h.state, "10000001");
    let (_, token_b) = seed_school(&h.state, "10000002");

    let id = create_draft(&h.app, &token_a).await;

    let (status, mine_a) =
        send(&h.app, request("GET", "/api/proposals/mine", Some(&token_a), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine_a.as_array().unwrap().len(), 1);

    let (status, mine_b) =
        send(&h.app, request("GET", "/api/proposals/mine", Some(&token_b), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(mine_b.as_array().unwrap().is_empty());

    let (status, _) = send(
        &h.app,
        request("GET", &format!("/api/proposals/{id}"), Some(&token_b), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_moves_to_pending_and_second_submit_conflicts() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000003");
    let id = create_draft(&h.app, &token).await;
    let uri = format!("/api/proposals/{id}/submit");

    let (status, body) = send(&h.app, request("POST", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert!(timestamp(&body, "updated_at") >= timestamp(&body, "created_at"));

    let (status, body) = send(&h.app, request("POST", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Pending proposals are no longer editable.
    let (status, _) = send(
        &h.app,
        request(
            "PUT",
            &format!("/api/proposals/{id}"),
            Some(&token),
            Some(json!({"title": "Judul baru"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn incomplete_draft_cannot_be_submitted() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000004");
    let (status, body) = send(
        &h.app,
        request(
            "POST",
            "/api/proposals",
            Some(&token),
            Some(json!({"title": "Belum lengkap"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap();

    let (status, _) = send(
        &h.app,
        request("POST", &format!("/api/proposals/{id}/submit"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn decision_on_terminal_proposal_conflicts() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000005");
    let id = approved_proposal(&h, &token).await;
    let admin = admin_token(&h.state);

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("/api/proposals/{id}/decision"),
            Some(&admin),
            Some(json!({"decision": "reject"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The approval opened exactly one campaign.
    let (status, campaigns) =
        send(&h.app, request("GET", "/api/donor/campaigns", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(campaigns.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_proposal_stays_rejected() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000006");
    let id = create_draft(&h.app, &token).await;
    send(
        &h.app,
        request("POST", &format!("/api/proposals/{id}/submit"), Some(&token), None),
    )
    .await;

    let admin = admin_token(&h.state);
    let (status, body) = send(
        &h.app,
        request(
            "POST",
            &format!("/api/proposals/{id}/decision"),
            Some(&admin),
            Some(json!({"decision": "reject", "note": "anggaran tidak rinci"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["decision_note"], "anggaran tidak rinci");

    let (status, _) = send(
        &h.app,
        request("POST", &format!("/api/proposals/{id}/submit"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(h.state.campaigns.is_empty());
}

#[tokio::test]
async fn schools_cannot_decide() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000007");
    let id = create_draft(&h.app, &token).await;
    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("/api/proposals/{id}/decision"),
            Some(&token),
            Some(json!({"decision": "approve"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Approval gate ────────────────────────────────────────────────────

#[tokio::test]
async fn report_requires_approved_proposal() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000008");
    let draft = create_draft(&h.app, &token).await;
    let report = |proposal_id: &str| {
        json!({
            "proposal_id": proposal_id,
            "title": "Laporan tahap 1",
            "description": "Pembelian rak",
            "items": [
                {"description": "Rak buku", "amount": 3_000_000u64},
                {"description": "Meja baca", "amount": 2_000_000u64}
            ]
        })
    };

    let (status, _) = send(
        &h.app,
        request("POST", "/api/reports", Some(&token), Some(report(&draft))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let approved = approved_proposal(&h, &token).await;
    let (status, body) = send(
        &h.app,
        request("POST", "/api/reports", Some(&token), Some(report(&approved))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "draft");
    assert_eq!(body["amount_used"], 5_000_000u64);
}

#[tokio::test]
async fn timeline_requires_approved_proposal() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000009");
    let draft = create_draft(&h.app, &token).await;
    let entry = |proposal_id: &str| {
        json!({
            "proposal_id": proposal_id,
            "title": "Serah terima rak",
            "activity_date": "2026-03-14"
        })
    };

    let (status, _) = send(
        &h.app,
        request("POST", "/api/timeline", Some(&token), Some(entry(&draft))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(h.state.timeline.is_empty());

    let approved = approved_proposal(&h, &token).await;
    let (status, _) = send(
        &h.app,
        request("POST", "/api/timeline", Some(&token), Some(entry(&approved))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, public) = send(
        &h.app,
        request("GET", &format!("/api/donor/campaigns/{approved}/timeline"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn other_schools_cannot_attach_to_a_proposal() {
    let h = harness();
    let (_, owner) = seed_school(&h.state, "10000010");
    let (_, other) = seed_school(&h.state, "10000011");
    let approved = approved_proposal(&h, &owner).await;

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            "/api/timeline",
            Some(&other),
            Some(json!({
                "proposal_id": approved,
                "title": "Bukan milik kami",
                "activity_date": "2026-03-14"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Donations ────────────────────────────────────────────────────────

#[tokio::test]
async fn donation_below_minimum_is_rejected() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000012");
    let campaign = approved_proposal(&h, &token).await;

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("/api/donor/campaigns/{campaign}/donations"),
            None,
            Some(json!({"donor_name": "Budi", "amount": 9_999u64})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(h.state.donations.is_empty());
}

#[tokio::test]
async fn donation_increments_counters_exactly() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000013");
    let campaign = approved_proposal(&h, &token).await;
    let uri = format!("/api/donor/campaigns/{campaign}/donations");

    let (status, receipt) = send(
        &h.app,
        request(
            "POST",
            &uri,
            None,
            Some(json!({"donor_name": "Siti", "amount": 25_000u64, "anonymous": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["campaign"]["collected_amount"], 25_000u64);
    assert_eq!(receipt["campaign"]["donors_count"], 1);
    assert_eq!(receipt["donation"]["donor_name"], "Anonim");

    let (status, listed) = send(&h.app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["donor_name"], "Anonim");
}

#[tokio::test]
async fn donation_to_unknown_campaign_is_not_found() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("/api/donor/campaigns/{}/donations", Uuid::new_v4()),
            None,
            Some(json!({"donor_name": "Budi", "amount": 10_000u64})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_donations_sum_correctly() {
    const DONORS: u64 = 64;
    const AMOUNT: u64 = 15_000;

    let h = harness();
    let (_, token) = seed_school(&h.state, "10000014");
    let campaign = approved_proposal(&h, &token).await;
    let uri = format!("/api/donor/campaigns/{campaign}/donations");

    let tasks: Vec<_> = (0..DONORS)
        .map(|i| {
            let app = h.app.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                let req = request(
                    "POST",
                    &uri,
                    None,
                    Some(json!({"donor_name": format!("Donatur {i}"), "amount": AMOUNT})),
                );
                app.oneshot(req).await.unwrap().status()
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::CREATED);
    }

    let response = h
        .app
        .clone()
        .oneshot(request("GET", &format!("/api/donor/campaigns/{campaign}"), None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["collected_amount"], DONORS * AMOUNT);
    assert_eq!(view["donors_count"], DONORS);
    assert_eq!(h.state.donations.len() as u64, DONORS);
}

#[tokio::test]
async fn stats_reflect_donations() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000015");
    let campaign = approved_proposal(&h, &token).await;
    send(
        &h.app,
        request(
            "POST",
            &format!("/api/donor/campaigns/{campaign}/donations"),
            None,
            Some(json!({"donor_name": "Rina", "amount": 100_000u64})),
        ),
    )
    .await;

    let (status, stats) = send(&h.app, request("GET", "/api/donor/stats", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["campaigns"], 1);
    assert_eq!(stats["donations"], 1);
    assert_eq!(stats["total_collected"], 100_000u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn donation_log_never_lags_campaign_counters() {
    const DONORS: u64 = 48;

    let h = harness();
    let (_, token) = seed_school(&h.state, "10000016");
    let campaign = approved_proposal(&h, &token).await;
    let campaign_id: Uuid = campaign.parse().unwrap();
    let uri = format!("/api/donor/campaigns/{campaign}/donations");

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let state = h.state.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let mut reads = 0u64;
            loop {
                let finished = done.load(Ordering::Acquire);
                let (counted, logged) = state
                    .campaigns
                    .read_with(&campaign_id, &state.donations, |c, log| {
                        let logged = log.values().filter(|d| d.campaign_id == campaign_id).count();
                        (c.donors_count, logged as u64)
                    })
                    .unwrap();
                assert_eq!(counted, logged);

                // Separate reads, campaign first: the log may be ahead, never behind.
                let counted = state.campaigns.get(&campaign_id).unwrap().donors_count;
                let logged = state.donations.count(|d| d.campaign_id == campaign_id) as u64;
                assert!(counted <= logged, "{counted} counted, {logged} logged");

                reads += 1;
                if finished {
                    break reads;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let tasks: Vec<_> = (0..DONORS)
        .map(|i| {
            let app = h.app.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                let req = request(
                    "POST",
                    &uri,
                    None,
                    Some(json!({"donor_name": format!("Donatur {i}"), "amount": 20_000u64})),
                );
                app.oneshot(req).await.unwrap().status()
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::CREATED);
    }
    done.store(true, Ordering::Release);
    assert!(reader.await.unwrap() > 0);

    let campaign = h.state.campaigns.get(&campaign_id).unwrap();
    assert_eq!(campaign.donors_count, DONORS);
    assert_eq!(h.state.donations.len() as u64, DONORS);
}

// ── Reports ──────────────────────────────────────────────────────────

fn report_body(proposal_id: &str, title: &str) -> Value {
    json!({
        "proposal_id": proposal_id,
        "title": title,
        "description": "Pembelian rak",
        "items": [{"description": "Rak buku", "amount": 3_000_000u64}]
    })
}

async fn draft_report(h: &Harness, token: &str, proposal_id: &str, title: &str) -> String {
    let (status, body) = send(
        &h.app,
        request("POST", "/api/reports", Some(token), Some(report_body(proposal_id, title))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn report_lifecycle_from_draft_to_review() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000020");
    let admin = admin_token(&h.state);
    let proposal = approved_proposal(&h, &token).await;
    let report = draft_report(&h, &token, &proposal, "Laporan tahap 1").await;
    let report_uri = format!("/api/reports/{report}");

    // Drafts are editable.
    let (status, body) = send(
        &h.app,
        request("PUT", &report_uri, Some(&token), Some(json!({"title": "Laporan tahap 1 (revisi)"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["title"], "Laporan tahap 1 (revisi)");

    // Only submitted reports can be reviewed.
    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("{report_uri}/decision"),
            Some(&admin),
            Some(json!({"decision": "approve"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &h.app,
        request("POST", &format!("{report_uri}/submit"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "submitted");
    assert!(timestamp(&body, "updated_at") >= timestamp(&body, "created_at"));

    // Submitted reports are frozen for the school.
    let (status, _) = send(
        &h.app,
        request("PUT", &report_uri, Some(&token), Some(json!({"title": "Terlambat"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&h.app, request("DELETE", &report_uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("{report_uri}/decision"),
            Some(&token),
            Some(json!({"decision": "approve"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &h.app,
        request(
            "POST",
            &format!("{report_uri}/decision"),
            Some(&admin),
            Some(json!({"decision": "approve", "note": "sesuai nota"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "approved");

    let (status, _) = send(
        &h.app,
        request(
            "POST",
            &format!("{report_uri}/decision"),
            Some(&admin),
            Some(json!({"decision": "reject"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(h.state.reports.get(&report.parse().unwrap()).unwrap().status.as_str(), "approved");
}

#[tokio::test]
async fn donors_see_only_approved_reports() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000021");
    let admin = admin_token(&h.state);
    let proposal = approved_proposal(&h, &token).await;

    let mut outcomes = Vec::new();
    for (title, decision) in [("Diterima", "approve"), ("Ditolak", "reject")] {
        let report = draft_report(&h, &token, &proposal, title).await;
        send(
            &h.app,
            request("POST", &format!("/api/reports/{report}/submit"), Some(&token), None),
        )
        .await;
        let (status, body) = send(
            &h.app,
            request(
                "POST",
                &format!("/api/reports/{report}/decision"),
                Some(&admin),
                Some(json!({"decision": decision})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        outcomes.push(body["status"].as_str().unwrap().to_string());
    }
    assert_eq!(outcomes, ["approved", "rejected"]);
    draft_report(&h, &token, &proposal, "Masih draf").await;

    let (status, public) = send(
        &h.app,
        request("GET", &format!("/api/donor/campaigns/{proposal}/reports"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let public = public.as_array().unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0]["title"], "Diterima");
}

#[tokio::test]
async fn draft_report_can_be_deleted_by_owner_only() {
    let h = harness();
    let (_, owner) = seed_school(&h.state, "10000022");
    let (_, other) = seed_school(&h.state, "10000023");
    let proposal = approved_proposal(&h, &owner).await;
    let report = draft_report(&h, &owner, &proposal, "Salah input").await;
    let uri = format!("/api/reports/{report}");

    let (status, _) = send(&h.app, request("DELETE", &uri, Some(&other), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&h.app, request("DELETE", &uri, Some(&owner), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.state.reports.is_empty());
}

// ── Timeline ─────────────────────────────────────────────────────────

#[tokio::test]
async fn timeline_entries_are_deleted_by_their_school_only() {
    let h = harness();
    let (_, owner) = seed_school(&h.state, "10000024");
    let (_, other) = seed_school(&h.state, "10000025");
    let approved = approved_proposal(&h, &owner).await;

    let (status, entry) = send(
        &h.app,
        request(
            "POST",
            "/api/timeline",
            Some(&owner),
            Some(json!({
                "proposal_id": approved,
                "title": "Serah terima rak",
                "activity_date": "2026-03-14"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    let uri = format!("/api/timeline/{}", entry["id"].as_str().unwrap());

    let (status, _) = send(&h.app, request("DELETE", &uri, Some(&other), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.state.timeline.len(), 1);

    let (status, _) = send(&h.app, request("DELETE", &uri, Some(&owner), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.state.timeline.is_empty());

    let (status, _) = send(&h.app, request("DELETE", &uri, Some(&owner), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Admin sign-in ────────────────────────────────────────────────────

fn with_admin(config: &mut AppConfig) {
    config.admin = Some(AdminCredential {
        username: "pengawas".into(),
        password_hash: Zeroizing::new(hash_password("kata-sandi-pengawas").unwrap()),
    });
}

fn admin_login(username: &str, password: &str) -> Request<Body> {
    request(
        "POST",
        "/api/auth/admin/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
}

#[tokio::test]
async fn admin_login_issues_admin_session() {
    let h = harness_with(with_admin);
    let (status, body) = send(&h.app, admin_login("pengawas", "kata-sandi-pengawas")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["session"]["role"], "admin");

    let token = body["session"]["token"].as_str().unwrap().to_string();
    let (status, dashboard) =
        send(&h.app, request("GET", "/api/dashboard/admin", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["schools"], 0);
}

#[tokio::test]
async fn admin_login_rejects_bad_credentials() {
    let h = harness_with(with_admin);
    for (username, password) in [
        ("pengawas", "salah"),
        ("orang-lain", "kata-sandi-pengawas"),
    ] {
        let (status, body) = send(&h.app, admin_login(username, password)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
    assert!(h.state.sessions.is_empty());
}

#[tokio::test]
async fn admin_login_unavailable_without_credential() {
    let h = harness();
    let (status, _) = send(&h.app, admin_login("admin", "apa-saja")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ── Uploads ──────────────────────────────────────────────────────────

const BOUNDARY: &str = "edufund-test-boundary";

fn upload(token: Option<&str>, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"berkas\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn upload_stores_accepted_file() {
    let h = harness_with(|c| c.upload_max_bytes = 1024);
    let (_, token) = seed_school(&h.state, "10000030");
    let png = b"\x89PNG\r\n\x1a\nsampul";

    let (status, body) = send(&h.app, upload(Some(&token), "image/png", png)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["content_type"], "image/png");
    assert_eq!(body["size"], png.len());
    let key = body["key"].as_str().unwrap();
    assert!(key.ends_with(".png"));
    assert_eq!(body["url"], format!("/uploads/{key}"));
    assert_eq!(std::fs::read(h._uploads.path().join(key)).unwrap(), png);
}

#[tokio::test]
async fn upload_rejects_bad_files() {
    let h = harness_with(|c| c.upload_max_bytes = 1024);
    let (_, token) = seed_school(&h.state, "10000031");

    let (status, _) = send(&h.app, upload(Some(&token), "text/html", b"<script></script>")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&h.app, upload(Some(&token), "application/pdf", &[b'%'; 2048])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = send(&h.app, upload(Some(&token), "image/jpeg", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&h.app, upload(None, "image/png", b"png")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(std::fs::read_dir(h._uploads.path()).unwrap().count(), 0);
}

// ── Profile & dashboards ─────────────────────────────────────────────

#[tokio::test]
async fn profile_rename_reaches_campaigns() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000040");
    let campaign = approved_proposal(&h, &token).await;

    let (status, profile) = send(
        &h.app,
        request(
            "PUT",
            "/api/schools/me",
            Some(&token),
            Some(json!({"name": "SD Negeri Cendekia", "phone": "0341-555123", "address": "  "})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{profile}");
    assert_eq!(profile["name"], "SD Negeri Cendekia");
    assert_eq!(profile["phone"], "0341-555123");
    assert_eq!(profile["address"], Value::Null);

    let (_, me) = send(&h.app, request("GET", "/api/schools/me", Some(&token), None)).await;
    assert_eq!(me["name"], "SD Negeri Cendekia");

    let (status, view) = send(
        &h.app,
        request("GET", &format!("/api/donor/campaigns/{campaign}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["school_name"], "SD Negeri Cendekia");

    let (_, found) = send(
        &h.app,
        request("GET", "/api/donor/campaigns?q=cendekia", None, None),
    )
    .await;
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn profile_rejects_blank_name() {
    let h = harness();
    let (id, token) = seed_school(&h.state, "10000041");
    let (status, _) = send(
        &h.app,
        request("PUT", "/api/schools/me", Some(&token), Some(json!({"name": "   "}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(h.state.schools.get(&id).unwrap().name, "SD Negeri 10000041");
}

#[tokio::test]
async fn dashboards_summarize_activity() {
    let h = harness();
    let (_, token) = seed_school(&h.state, "10000042");
    let admin = admin_token(&h.state);
    let campaign = approved_proposal(&h, &token).await;
    create_draft(&h.app, &token).await;
    draft_report(&h, &token, &campaign, "Laporan awal").await;
    send(
        &h.app,
        request(
            "POST",
            &format!("/api/donor/campaigns/{campaign}/donations"),
            None,
            Some(json!({"donor_name": "Rina", "amount": 40_000u64})),
        ),
    )
    .await;

    let (status, school) =
        send(&h.app, request("GET", "/api/dashboard/school", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK, "{school}");
    assert_eq!(school["proposals"]["approved"], 1);
    assert_eq!(school["proposals"]["draft"], 1);
    assert_eq!(school["proposals"]["rejected"], 0);
    assert_eq!(school["reports"]["draft"], 1);
    assert_eq!(school["campaigns"], 1);
    assert_eq!(school["total_collected"], 40_000u64);
    assert_eq!(school["donors_count"], 1);

    let (status, _) =
        send(&h.app, request("GET", "/api/dashboard/admin", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, overview) =
        send(&h.app, request("GET", "/api/dashboard/admin", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["schools"], 1);
    assert_eq!(overview["proposals"]["approved"], 1);
    assert_eq!(overview["proposals"]["pending"], 0);
    assert_eq!(overview["reports"]["submitted"], 0);
    assert_eq!(overview["donations"], 1);
    assert_eq!(overview["total_collected"], 40_000u64);

    let (status, _) =
        send(&h.app, request("GET", "/api/dashboard/school", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
