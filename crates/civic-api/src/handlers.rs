//! API Handlers
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use civic_core::{CivicError, ReportDraft, ReportFilter, ReportId, ReportStatus, UserId, VoteType};
use civic_reputation::xp_to_next_level;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::metrics;
use crate::middleware::{RequestUser, Viewer};
use crate::AppState;

const DEFAULT_LEADERBOARD: usize = 10;
const MAX_LEADERBOARD: usize = 100;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let ai_healthy = state.engine.ai_healthy().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ai_service": if ai_healthy { "up" } else { "down" },
        "timestamp": Utc::now(),
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    state.metrics.observe_audit(&state.engine.audit_stats());
    match metrics::encode(state.metrics.registry()) {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    /// Generated when absent
    pub user_id: Option<UserId>,
    pub display_name: String,
}

pub async fn enroll_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user_id = payload.user_id.unwrap_or_else(Uuid::new_v4);
    let user = state.engine.enroll_user(user_id, payload.display_name)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "user": user }))))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<Json<Value>> {
    let user = state.engine.reputation(user_id)?;
    let to_next = xp_to_next_level(user.xp);
    Ok(Json(json!({
        "success": true,
        "user": user,
        "xp_to_next_level": to_next,
    })))
}

/// Every vote the user has cast, oldest first
pub async fn user_votes(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> ApiResult<Json<Value>> {
    state.engine.reputation(user_id)?;
    let votes = state.engine.votes_by_user(user_id);
    Ok(Json(json!({
        "success": true,
        "count": votes.len(),
        "votes": votes,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD).min(MAX_LEADERBOARD);
    let users = state.engine.leaderboard(limit);
    Json(json!({ "success": true, "users": users }))
}

// =============================================================================
// Reports
// =============================================================================

pub async fn submit_report(
    State(state): State<AppState>,
    RequestUser(reporter): RequestUser,
    ApiJson(draft): ApiJson<ReportDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let report = state.engine.submit_report(reporter, draft)?;
    state.metrics.reports_submitted.inc();
    let reputation = state.engine.reputation(reporter)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "report": report,
            "xp_earned": state.engine.ledger().awards().report_submission,
            "reputation": reputation,
        })),
    ))
}

/// Raw query strings; enums are parsed so bad values become 400s
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub reporter: Option<UserId>,
    #[serde(default)]
    pub with_location: bool,
}

impl ReportQuery {
    fn to_filter(&self) -> Result<ReportFilter, CivicError> {
        let mut filter = ReportFilter::new();
        if let Some(status) = &self.status {
            filter = filter.status(status.parse()?);
        }
        if let Some(category) = &self.category {
            filter = filter.category(category.parse()?);
        }
        if let Some(severity) = &self.severity {
            filter = filter.severity(severity.parse()?);
        }
        if let Some(reporter) = self.reporter {
            filter = filter.reporter(reporter);
        }
        Ok(filter)
    }
}

pub async fn list_reports(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.to_filter()?;
    let reports = if query.with_location {
        state.engine.reports_with_location(&filter)
    } else {
        state.engine.reports(&filter)
    };
    Ok(Json(json!({
        "success": true,
        "count": reports.len(),
        "reports": reports,
    })))
}

pub async fn get_report(
    State(state): State<AppState>,
    ApiPath(report_id): ApiPath<ReportId>,
) -> ApiResult<Json<Value>> {
    let report = state.engine.report(report_id)?;
    Ok(Json(json!({ "success": true, "report": report })))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    ApiPath(report_id): ApiPath<ReportId>,
) -> ApiResult<Json<Value>> {
    let report = state.engine.delete_report(report_id, actor)?;
    Ok(Json(json!({ "success": true, "deleted": report.id })))
}

// =============================================================================
// Votes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_type: String,
    pub comment: Option<String>,
}

pub async fn cast_vote(
    State(state): State<AppState>,
    RequestUser(voter): RequestUser,
    ApiPath(report_id): ApiPath<ReportId>,
    ApiJson(payload): ApiJson<VoteRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let vote_type: VoteType = payload.vote_type.parse()?;
    let result = state
        .engine
        .cast_vote(voter, report_id, vote_type, payload.comment)
        .inspect_err(|err| {
            if matches!(err, CivicError::DuplicateVote { .. }) {
                state.metrics.duplicate_votes.inc();
            }
        })?;
    state.metrics.votes_accepted.inc();

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "result": result })),
    ))
}

pub async fn list_votes(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    ApiPath(report_id): ApiPath<ReportId>,
) -> ApiResult<Json<Value>> {
    let summary = state.engine.vote_summary(report_id, viewer)?;
    let votes = state.engine.votes_for_report(report_id);
    Ok(Json(json!({
        "success": true,
        "summary": summary,
        "votes": votes,
    })))
}

// =============================================================================
// Administration
// =============================================================================

pub async fn approve_report(
    State(state): State<AppState>,
    Viewer(admin): Viewer,
    ApiPath(report_id): ApiPath<ReportId>,
) -> ApiResult<Json<Value>> {
    let result = state.engine.approve_report(report_id, admin)?;
    Ok(Json(json!({ "success": true, "result": result })))
}

pub async fn reject_report(
    State(state): State<AppState>,
    Viewer(admin): Viewer,
    ApiPath(report_id): ApiPath<ReportId>,
) -> ApiResult<Json<Value>> {
    let result = state.engine.reject_report(report_id, admin)?;
    Ok(Json(json!({ "success": true, "result": result })))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    ApiPath(report_id): ApiPath<ReportId>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let status: ReportStatus = payload.status.parse()?;
    let result = state.engine.set_operational_status(report_id, status, actor)?;
    Ok(Json(json!({ "success": true, "result": result })))
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "reports": state.engine.stats(),
        "audit": state.engine.audit_stats(),
    }))
}

// =============================================================================
// Audit
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub report: Option<ReportId>,
    pub actor: Option<UserId>,
    /// RFC 3339 lower bound on `recorded_at`
    pub since: Option<DateTime<Utc>>,
    /// `jsonl` exports the whole retained trail
    pub format: Option<String>,
}

pub async fn audit_trail(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AuditQuery>,
) -> ApiResult<Response> {
    match query.format.as_deref() {
        None | Some("json") => {}
        Some("jsonl") => {
            let body = state.engine.audit_jsonl();
            return Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response());
        }
        Some(other) => {
            return Err(CivicError::validation(format!("unknown audit format '{}'", other)).into());
        }
    }

    let mut entries = match (query.report, query.actor, query.since) {
        (Some(report_id), _, _) => state.engine.audit_for_report(report_id),
        (None, Some(actor), _) => state.engine.audit_by_actor(actor),
        (None, None, Some(since)) => state.engine.audit_since(since),
        (None, None, None) => state.engine.audit_entries(),
    };
    if let Some(actor) = query.actor {
        entries.retain(|e| e.actor == Some(actor));
    }
    if let Some(since) = query.since {
        entries.retain(|e| e.recorded_at >= since);
    }

    Ok(Json(json!({
        "success": true,
        "count": entries.len(),
        "entries": entries,
    }))
    .into_response())
}
