//! Auto-verification rules
//!
//! Two independent triggers feed the same one-way latch on a report: the
//! AI confidence rule and the community vote rule. Either one firing on a
//! pending report moves it to verified; neither can ever move it back.

use serde::{Deserialize, Serialize};
use std::fmt;

use civic_core::Report;

/// Where a verification decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    /// AI confidence rule
    Ai,
    /// Community vote rule
    Community,
    /// Administrative override
    Admin,
}

impl fmt::Display for VerificationSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VerificationSource::Ai => write!(f, "ai"),
            VerificationSource::Community => write!(f, "community"),
            VerificationSource::Admin => write!(f, "admin"),
        }
    }
}

/// Thresholds for automatic verification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoVerifyPolicy {
    /// AI confidence must be strictly greater than this
    pub ai_confidence_threshold: f64,

    /// Minimum upvotes, in addition to upvotes outnumbering downvotes
    pub min_upvotes: u32,
}

impl AutoVerifyPolicy {
    pub fn standard() -> Self {
        Self {
            ai_confidence_threshold: 0.8,
            min_upvotes: 2,
        }
    }

    /// `ai_verified && ai_confidence > threshold`
    pub fn ai_rule_fires(&self, report: &Report) -> bool {
        report.ai_verified
            && report
                .ai_confidence
                .map_or(false, |c| c > self.ai_confidence_threshold)
    }

    /// `upvotes >= min_upvotes && upvotes > downvotes`
    pub fn community_rule_fires(&self, report: &Report) -> bool {
        report.upvotes >= self.min_upvotes && report.upvotes > report.downvotes
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.ai_confidence_threshold) {
            return Err(format!(
                "ai_confidence_threshold must be within [0, 1], got {}",
                self.ai_confidence_threshold
            ));
        }
        if self.min_upvotes == 0 {
            return Err("min_upvotes must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for AutoVerifyPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
