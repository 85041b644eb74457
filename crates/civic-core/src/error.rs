//! Unified Error Model
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CivicError {
    /// Malformed input, rejected before any mutation
    #[error("VALIDATION/{0}")]
    Validation(String),

    #[error("NOT_FOUND/{entity} {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The (user, report) pair already carries a vote
    #[error("DUPLICATE_VOTE/user {user_id} already voted on report {report_id}")]
    DuplicateVote { user_id: Uuid, report_id: Uuid },

    #[error("PROVIDER/{0}")]
    Provider(String),
}

impl CivicError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CivicError::Validation(msg.into())
    }

    pub fn report_not_found(id: Uuid) -> Self {
        CivicError::NotFound { entity: "report", id }
    }

    pub fn user_not_found(id: Uuid) -> Self {
        CivicError::NotFound { entity: "user", id }
    }

    /// Stable machine-readable code, used by the API layer
    pub fn code(&self) -> &'static str {
        match self {
            CivicError::Validation(_) => "validation",
            CivicError::NotFound { .. } => "not_found",
            CivicError::DuplicateVote { .. } => "already_voted",
            CivicError::Provider(_) => "provider_failure",
        }
    }
}

pub type CivicResult<T> = Result<T, CivicError>;
