//! Verdict and result types
//!
//! `AiVerdict` is what the classifier says about a report's evidence;
//! `AiOutcome` is what the engine applies (a verdict or a failure).
//! `VoteResult` and `VoteSummary` are the community-side counterparts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use civic_core::{Report, ReportId, ReportStatus, Vote, VoteType};
use civic_reputation::UserReputation;

/// Classifier output for one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiVerdict {
    /// Whether the evidence matches the reported category
    pub verified: bool,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Predicted label
    pub prediction: String,
}

impl AiVerdict {
    pub fn new(verified: bool, confidence: f64, prediction: impl Into<String>) -> Self {
        Self {
            verified,
            confidence,
            prediction: prediction.into(),
        }
    }

    /// A verdict is well-formed when its confidence is a finite value in [0, 1]
    pub fn is_well_formed(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// What the engine applies to a report once the AI channel settles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiOutcome {
    /// The classifier answered
    Verdict(AiVerdict),

    /// Unreachable, timed out, or answered with garbage
    Failed { reason: String },
}

impl AiOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        AiOutcome::Failed {
            reason: reason.into(),
        }
    }

    /// Malformed verdicts are demoted to failures
    pub fn sanitized(self) -> Self {
        match self {
            AiOutcome::Verdict(v) if !v.is_well_formed() => AiOutcome::failed(format!(
                "malformed verdict: confidence {} outside [0, 1]",
                v.confidence
            )),
            other => other,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AiOutcome::Failed { .. })
    }
}

/// Result of applying an AI outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiApplication {
    pub report: Report,
    /// This outcome moved the report to verified
    pub auto_verified: bool,
}

/// Result of an accepted vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResult {
    pub vote: Vote,
    pub upvotes: u32,
    pub downvotes: u32,
    pub status: ReportStatus,
    /// This vote moved the report to verified
    pub auto_verified: bool,
    pub xp_earned: u64,
    /// Voter's reputation after the award
    pub reputation: UserReputation,
}

/// Tallies of a report as seen by one viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub report_id: ReportId,
    pub upvotes: u32,
    pub downvotes: u32,
    pub has_voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<VoteType>,
}

/// Report counts by status and severity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
}
