//! Report lifecycle audit trail
//!
//! Records every lifecycle decision the engine takes on a report: automatic
//! verifications, AI outcomes, administrative overrides and deletions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use civic_core::{ReportId, ReportStatus, UserId};

use crate::rules::VerificationSource;

const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub report_id: ReportId,

    /// Who triggered this, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_status: Option<ReportStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_status: Option<ReportStatus>,

    /// Rule or override behind a verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<VerificationSource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType, report_id: ReportId) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            event_type,
            report_id,
            actor: None,
            from_status: None,
            to_status: None,
            source: None,
            detail: None,
        }
    }

    pub fn with_actor(mut self, actor: Option<UserId>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_transition(mut self, from: ReportStatus, to: ReportStatus) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    pub fn with_source(mut self, source: VerificationSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ReportSubmitted,
    /// AI verdict written to the report
    AiVerdictApplied,
    /// AI channel failed; default fields written
    AiVerificationFailed,
    /// An automatic rule latched the report to verified
    AutoVerified,
    AdminApproved,
    AdminRejected,
    /// Operational move to in_progress / resolved
    StatusChanged,
    ReportDeleted,
}

/// Bounded, oldest-first record of lifecycle events. Once full, the oldest
/// entry is evicted for each new one.
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_CAPACITY)
    }

    pub fn with_max_entries(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn log(&mut self, entry: AuditEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn entries_since(&self, since: DateTime<Utc>) -> Vec<&AuditEntry> {
        self.entries().filter(|e| e.recorded_at >= since).collect()
    }

    pub fn entries_for_report(&self, report_id: ReportId) -> Vec<&AuditEntry> {
        self.entries().filter(|e| e.report_id == report_id).collect()
    }

    pub fn entries_by_actor(&self, actor: UserId) -> Vec<&AuditEntry> {
        self.entries().filter(|e| e.actor == Some(actor)).collect()
    }

    /// One JSON object per line
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            if let Ok(line) = serde_json::to_string(entry) {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&line);
            }
        }
        out
    }

    pub fn stats(&self) -> AuditStats {
        let mut stats = AuditStats {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in self.entries() {
            match (entry.event_type, entry.source) {
                (AuditEventType::ReportSubmitted, _) => stats.submitted += 1,
                (AuditEventType::AutoVerified, Some(VerificationSource::Ai)) => stats.auto_verified_ai += 1,
                (AuditEventType::AutoVerified, Some(VerificationSource::Community)) => {
                    stats.auto_verified_community += 1
                }
                (AuditEventType::AdminApproved, _) => stats.admin_approved += 1,
                (AuditEventType::AdminRejected, _) => stats.admin_rejected += 1,
                (AuditEventType::AiVerificationFailed, _) => stats.ai_failures += 1,
                _ => {}
            }
        }
        stats
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Event counts over the retained entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub submitted: usize,
    pub auto_verified_ai: usize,
    pub auto_verified_community: usize,
    pub admin_approved: usize,
    pub admin_rejected: usize,
    pub ai_failures: usize,
}
