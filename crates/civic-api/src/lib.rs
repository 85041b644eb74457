//! Civic API /v1: REST endpoints over the verification engine
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use civic_verification::VerificationEngine;

use crate::metrics::ApiMetrics;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: VerificationEngine,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(engine: VerificationEngine) -> Result<Self, prometheus::Error> {
        Ok(Self {
            engine,
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/v1/users", post(handlers::enroll_user))
        .route("/v1/users/{id}", get(handlers::get_user))
        .route("/v1/users/{id}/votes", get(handlers::user_votes))
        .route("/v1/leaderboard", get(handlers::leaderboard))
        .route("/v1/reports", post(handlers::submit_report).get(handlers::list_reports))
        .route(
            "/v1/reports/{id}",
            get(handlers::get_report).delete(handlers::delete_report),
        )
        .route(
            "/v1/reports/{id}/votes",
            post(handlers::cast_vote).get(handlers::list_votes),
        )
        .route("/v1/reports/{id}/approve", post(handlers::approve_report))
        .route("/v1/reports/{id}/reject", post(handlers::reject_report))
        .route("/v1/reports/{id}/status", put(handlers::set_status))
        .route("/v1/stats", get(handlers::stats))
        .route("/v1/audit", get(handlers::audit_trail))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves, then let in-flight AI verifications land
pub async fn run<F>(addr: &str, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let engine = state.engine.clone();
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Civic API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("draining AI verifications");
    engine.wait_for_ai().await;
    Ok(())
}
