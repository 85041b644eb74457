//! HTTP tests driving the router in-process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use civic_api::{create_app, AppState};
use civic_verification::{DisabledProvider, EngineConfig, ScriptedProvider, VerificationEngine};

fn test_app() -> (Router, VerificationEngine) {
    let engine = VerificationEngine::new(EngineConfig::default(), Arc::new(DisabledProvider));
    let state = AppState::new(engine.clone()).unwrap();
    (create_app(state), engine)
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn enroll(app: &Router, name: &str) -> Uuid {
    let (status, body) = send(app, "POST", "/v1/users", None, Some(json!({ "display_name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["user"]["user_id"].as_str().unwrap().parse().unwrap()
}

async fn submit(app: &Router, reporter: Uuid) -> Uuid {
    let (status, body) = send(
        app,
        "POST",
        "/v1/reports",
        Some(reporter),
        Some(json!({
            "title": "Broken streetlight",
            "description": "Dark since Tuesday",
            "category": "STREETLIGHT",
            "latitude": 51.5,
            "longitude": -0.12
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["report"]["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ai_service"], "down");
}

#[tokio::test]
async fn test_health_bounded_when_classifier_hangs() {
    let provider = ScriptedProvider::new().with_health_delay(Duration::from_secs(30));
    let engine = VerificationEngine::new(EngineConfig::default(), Arc::new(provider));
    let app = create_app(AppState::new(engine).unwrap());

    let started = Instant::now();
    let (status, body) = send(&app, "GET", "/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ai_service"], "down");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_submit_and_fetch_report() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    let id = submit(&app, reporter).await;

    let (status, body) = send(&app, "GET", &format!("/v1/reports/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "pending");
    assert_eq!(body["report"]["category"], "streetlight");
    assert_eq!(body["report"]["severity"], "moderate");

    let (_, user) = send(&app, "GET", &format!("/v1/users/{}", reporter), None, None).await;
    assert_eq!(user["user"]["xp"], 10);
    assert_eq!(user["xp_to_next_level"], 90);
}

#[tokio::test]
async fn test_submit_requires_user_header() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/reports",
        None,
        Some(json!({ "title": "t", "description": "d", "category": "pothole" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_unknown_category_is_bad_request() {
    let (app, engine) = test_app();
    let reporter = enroll(&app, "rita").await;
    let (status, body) = send(
        &app,
        "POST",
        "/v1/reports",
        Some(reporter),
        Some(json!({ "title": "Bridge", "description": "Cracked", "category": "BRIDGE" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
    assert_eq!(engine.stats().total, 0);
}

#[tokio::test]
async fn test_votes_verify_and_duplicate_conflicts() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    let id = submit(&app, reporter).await;
    let ana = enroll(&app, "ana").await;
    let ben = enroll(&app, "ben").await;
    let uri = format!("/v1/reports/{}/votes", id);

    let (status, _) = send(&app, "POST", &uri, Some(ana), Some(json!({ "vote_type": "up" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", &uri, Some(ana), Some(json!({ "vote_type": "down" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_voted");

    let (status, body) = send(&app, "POST", &uri, Some(ben), Some(json!({ "vote_type": "upvote" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["auto_verified"], true);
    assert_eq!(body["result"]["status"], "verified");
    assert_eq!(body["result"]["xp_earned"], 5);

    let (_, summary) = send(&app, "GET", &uri, Some(ana), None).await;
    assert_eq!(summary["summary"]["upvotes"], 2);
    assert_eq!(summary["summary"]["has_voted"], true);
    assert_eq!(summary["summary"]["user_vote"], "upvote");
    assert_eq!(summary["votes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_report_is_not_found() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", &format!("/v1/reports/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_admin_and_operational_status() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    let admin = Uuid::new_v4();
    let id = submit(&app, reporter).await;

    let (status, body) = send(&app, "POST", &format!("/v1/reports/{}/approve", id), Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["report"]["verified"], true);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/v1/reports/{}/status", id),
        Some(admin),
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["report"]["status"], "in_progress");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/reports/{}/status", id),
        Some(admin),
        Some(json!({ "status": "verified" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", &format!("/v1/reports/{}/reject", id), Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["report"]["status"], "rejected");
    assert_eq!(body["result"]["report"]["verified"], true);
}

#[tokio::test]
async fn test_list_filters_and_stats() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    let first = submit(&app, reporter).await;
    submit(&app, reporter).await;
    send(&app, "POST", &format!("/v1/reports/{}/approve", first), None, None).await;

    let (status, body) = send(&app, "GET", "/v1/reports?status=verified", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = send(&app, "GET", "/v1/reports?category=bridge", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/v1/reports?with_location=true", None, None).await;
    assert_eq!(body["count"], 2);

    let (_, stats) = send(&app, "GET", "/v1/stats", None, None).await;
    assert_eq!(stats["reports"]["total"], 2);
    assert_eq!(stats["reports"]["by_status"]["pending"], 1);
    assert_eq!(stats["audit"]["admin_approved"], 1);

    let (_, board) = send(&app, "GET", "/v1/leaderboard?limit=1", None, None).await;
    assert_eq!(board["users"][0]["xp"], 20);
}

#[tokio::test]
async fn test_delete_report() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    let id = submit(&app, reporter).await;

    let (status, _) = send(&app, "DELETE", &format!("/v1/reports/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &format!("/v1/reports/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_exposed() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    submit(&app, reporter).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("civic_reports_submitted_total 1"));
    assert!(text.contains("civic_http_requests_total"));
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let (app, engine) = test_app();
    let reporter = enroll(&app, "rita").await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/reports",
        Some(reporter),
        Some(json!({ "description": "d", "category": "pothole" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "validation");
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (status, body) = send(
        &app,
        "POST",
        "/v1/reports",
        Some(reporter),
        Some(json!({ "title": "t", "description": "d", "category": "pothole", "latitude": "north" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
    assert_eq!(engine.stats().total, 0);

    let id = submit(&app, reporter).await;
    let (status, body) = send(&app, "POST", &format!("/v1/reports/{}/votes", id), Some(reporter), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_malformed_ids_are_validation_errors() {
    let (app, _) = test_app();
    let voter = enroll(&app, "vic").await;

    let (status, body) = send(&app, "POST", "/v1/reports/not-a-uuid/votes", Some(voter), Some(json!({ "vote_type": "up" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "validation");

    let (status, body) = send(&app, "GET", "/v1/reports/42", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    let (status, body) = send(&app, "GET", "/v1/leaderboard?limit=lots", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_user_vote_history() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    let voter = enroll(&app, "vic").await;
    let first = submit(&app, reporter).await;
    let second = submit(&app, reporter).await;

    for id in [first, second] {
        let (status, _) = send(&app, "POST", &format!("/v1/reports/{}/votes", id), Some(voter), Some(json!({ "vote_type": "up" }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", &format!("/v1/users/{}/votes", voter), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, "GET", &format!("/v1/users/{}/votes", reporter), None, None).await;
    assert_eq!(body["count"], 0);

    let (status, body) = send(&app, "GET", &format!("/v1/users/{}/votes", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_audit_trail_queries_and_export() {
    let (app, _) = test_app();
    let reporter = enroll(&app, "rita").await;
    let admin = Uuid::new_v4();
    let first = submit(&app, reporter).await;
    submit(&app, reporter).await;
    send(&app, "POST", &format!("/v1/reports/{}/approve", first), Some(admin), None).await;

    let (status, body) = send(&app, "GET", "/v1/audit", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (_, body) = send(&app, "GET", &format!("/v1/audit?report={}", first), None, None).await;
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, "GET", &format!("/v1/audit?actor={}", admin), None, None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"][0]["event_type"], "admin_approved");

    let (_, body) = send(&app, "GET", "/v1/audit?since=2999-01-01T00:00:00Z", None, None).await;
    assert_eq!(body["count"], 0);

    let (status, body) = send(&app, "GET", "/v1/audit?format=xml", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/v1/audit?format=jsonl").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/x-ndjson");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 3);
    for line in text.lines() {
        let entry: Value = serde_json::from_str(line).unwrap();
        assert!(entry["event_type"].is_string());
    }
}
