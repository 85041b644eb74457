//! AI verdict providers
//!
//! The classifier is an external collaborator. The engine only knows the
//! [`AiVerdictProvider`] contract: given a report's image evidence and its
//! category, eventually answer with an [`AiVerdict`] or a [`ProviderError`].
//!
//! ## Implementations
//!
//! - [`HttpVerdictProvider`]: multipart POST to the classification service
//! - [`ScriptedProvider`]: replays queued answers, for tests and local runs
//! - [`DisabledProvider`]: always fails; used when no service is configured

mod http;
mod scripted;

pub use http::HttpVerdictProvider;
pub use scripted::ScriptedProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use civic_core::{Category, Report, ReportId};

use crate::verdict::AiVerdict;

/// Error type for provider calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Network-level failure reaching the service
    #[error("AI service unreachable: {0}")]
    Unreachable(String),

    /// Call exceeded its time bound
    #[error("AI service timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success HTTP status
    #[error("AI service answered with status {0}")]
    Status(u16),

    /// Response could not be understood
    #[error("malformed AI response: {0}")]
    Malformed(String),

    /// Evidence file could not be read
    #[error("evidence unavailable: {0}")]
    MissingEvidence(String),

    /// No provider configured
    #[error("AI verification is not configured")]
    NotConfigured,
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Unreachable(_) | ProviderError::Timeout(_) => true,
            ProviderError::Status(code) => *code >= 500 || *code == 429,
            ProviderError::Malformed(_)
            | ProviderError::MissingEvidence(_)
            | ProviderError::NotConfigured => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Unreachable(err.to_string())
        }
    }
}

/// What the classifier is asked about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub report_id: ReportId,
    /// Evidence reference, relative to the upload root
    pub image_path: String,
    pub category: Category,
}

impl AiRequest {
    /// `None` when the report carries no image evidence
    pub fn for_report(report: &Report) -> Option<Self> {
        report.image_path.as_ref().map(|path| Self {
            report_id: report.id,
            image_path: path.clone(),
            category: report.category,
        })
    }
}

/// Contract of the external classification service
#[async_trait]
pub trait AiVerdictProvider: Send + Sync {
    /// Classify one report's evidence
    async fn verify(&self, request: &AiRequest) -> Result<AiVerdict, ProviderError>;

    /// Whether the service is reachable
    async fn health(&self) -> bool;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Provider used when no classification service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProvider;

#[async_trait]
impl AiVerdictProvider for DisabledProvider {
    async fn verify(&self, _request: &AiRequest) -> Result<AiVerdict, ProviderError> {
        Err(ProviderError::NotConfigured)
    }

    async fn health(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
