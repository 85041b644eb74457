//! Request middleware and caller identity extraction
//!
//! Authentication lives in front of this service. The authenticated user
//! id arrives in the `X-User-Id` header and is taken at face value.
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use civic_core::UserId;

use crate::error::ApiError;
use crate::AppState;

pub const USER_HEADER: &str = "x-user-id";

pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

/// Count every request by method and response status
pub async fn track_requests(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let response = next.run(req).await;
    state
        .metrics
        .http_requests
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    response
}

fn header_user(parts: &Parts) -> Result<Option<UserId>, ApiError> {
    let Some(value) = parts.headers.get(USER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::bad_request("X-User-Id is not valid text"))?;
    Uuid::parse_str(raw.trim())
        .map(Some)
        .map_err(|_| ApiError::bad_request(format!("X-User-Id is not a UUID: '{}'", raw)))
}

/// The calling user; the header is required
#[derive(Debug, Clone, Copy)]
pub struct RequestUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for RequestUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_user(parts)?
            .map(RequestUser)
            .ok_or_else(|| ApiError::bad_request("missing X-User-Id header"))
    }
}

/// The calling user when known; anonymous reads are allowed
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<UserId>);

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_user(parts).map(Viewer)
    }
}
