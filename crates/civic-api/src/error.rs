//! HTTP mapping of engine errors
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use civic_core::CivicError;

/// Wraps a [`CivicError`] so handlers can return it with `?`
#[derive(Debug)]
pub struct ApiError(pub CivicError);

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError(CivicError::validation(msg))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CivicError::Validation(_) => StatusCode::BAD_REQUEST,
            CivicError::NotFound { .. } => StatusCode::NOT_FOUND,
            CivicError::DuplicateVote { .. } => StatusCode::CONFLICT,
            CivicError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<CivicError> for ApiError {
    fn from(err: CivicError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("invalid path: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("invalid query: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }

        let body = json!({
            "success": false,
            "code": self.0.code(),
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(CivicError::report_not_found(id)).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError(CivicError::DuplicateVote { user_id: id, report_id: id }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError(CivicError::Provider("down".into())).status(), StatusCode::BAD_GATEWAY);
    }
}
