//! Award table: how much experience each event grants
//!
//! Policy, not mechanism. Defaults match the live deployment; a YAML
//! document can override any field.

use serde::{Deserialize, Serialize};

/// Events that grant experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardEvent {
    /// A report was accepted for review
    ReportSubmitted,
    /// A community vote was accepted
    VoteCast,
}

impl std::fmt::Display for AwardEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AwardEvent::ReportSubmitted => write!(f, "report_submitted"),
            AwardEvent::VoteCast => write!(f, "vote_cast"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwardTable {
    /// Granted to the reporter when a report is submitted
    pub report_submission: u32,

    /// Granted to the voter for each accepted vote
    pub vote_cast: u32,
}

impl AwardTable {
    pub fn standard() -> Self {
        Self {
            report_submission: 10,
            vote_cast: 5,
        }
    }

    /// Load table from YAML; missing fields fall back to the standard table
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| e.to_string())
    }

    pub fn amount_for(&self, event: AwardEvent) -> u32 {
        match event {
            AwardEvent::ReportSubmitted => self.report_submission,
            AwardEvent::VoteCast => self.vote_cast,
        }
    }
}

impl Default for AwardTable {
    fn default() -> Self {
        Self::standard()
    }
}
