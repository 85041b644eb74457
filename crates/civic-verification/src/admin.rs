//! Administrative overrides
//!
//! Approval and rejection bypass the automatic rules and may move a report
//! out of any state. Operational moves (`in_progress`, `resolved`) track
//! the work done on the ground and never touch the verified flag.

use serde::{Deserialize, Serialize};
use tracing::info;

use civic_core::{CivicError, CivicResult, Report, ReportId, ReportStatus, UserId};

use crate::audit::{AuditEntry, AuditEventType};
use crate::engine::VerificationEngine;
use crate::rules::VerificationSource;

/// Outcome of an override
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideResult {
    pub report: Report,
    pub previous_status: ReportStatus,
    /// False when the report already was in the requested state
    pub changed: bool,
}

impl VerificationEngine {
    /// Force a report to verified regardless of rule state
    pub fn approve_report(&self, report_id: ReportId, actor: Option<UserId>) -> CivicResult<OverrideResult> {
        let result = self.inner().reports.update(report_id, |report| {
            let previous_status = report.status;
            let changed = report.force_verified();
            Ok(OverrideResult {
                report: report.clone(),
                previous_status,
                changed,
            })
        })?;

        self.record(
            AuditEntry::new(AuditEventType::AdminApproved, report_id)
                .with_actor(actor)
                .with_transition(result.previous_status, ReportStatus::Verified)
                .with_source(VerificationSource::Admin),
        );
        info!(report_id = %report_id, from = %result.previous_status, "report approved by admin");
        Ok(result)
    }

    /// Force a report to rejected. The verified flag is left as it was.
    pub fn reject_report(&self, report_id: ReportId, actor: Option<UserId>) -> CivicResult<OverrideResult> {
        let result = self.inner().reports.update(report_id, |report| {
            let previous_status = report.status;
            report.status = ReportStatus::Rejected;
            Ok(OverrideResult {
                report: report.clone(),
                previous_status,
                changed: previous_status != ReportStatus::Rejected,
            })
        })?;

        self.record(
            AuditEntry::new(AuditEventType::AdminRejected, report_id)
                .with_actor(actor)
                .with_transition(result.previous_status, ReportStatus::Rejected),
        );
        info!(report_id = %report_id, from = %result.previous_status, "report rejected by admin");
        Ok(result)
    }

    /// Move a report to `in_progress` or `resolved`.
    ///
    /// Rejected reports cannot be worked on and resolved reports stay
    /// resolved.
    pub fn set_operational_status(
        &self,
        report_id: ReportId,
        status: ReportStatus,
        actor: Option<UserId>,
    ) -> CivicResult<OverrideResult> {
        if !matches!(status, ReportStatus::InProgress | ReportStatus::Resolved) {
            return Err(CivicError::validation(format!(
                "operational status must be in_progress or resolved, got {}",
                status
            )));
        }

        let result = self.inner().reports.update(report_id, |report| {
            let previous_status = report.status;
            match previous_status {
                ReportStatus::Rejected => {
                    return Err(CivicError::validation("rejected reports cannot be worked on"))
                }
                ReportStatus::Resolved if status != ReportStatus::Resolved => {
                    return Err(CivicError::validation("report is already resolved"))
                }
                _ => {}
            }
            report.status = status;
            Ok(OverrideResult {
                report: report.clone(),
                previous_status,
                changed: previous_status != status,
            })
        })?;

        if result.changed {
            self.record(
                AuditEntry::new(AuditEventType::StatusChanged, report_id)
                    .with_actor(actor)
                    .with_transition(result.previous_status, status),
            );
            info!(report_id = %report_id, from = %result.previous_status, to = %status, "report status changed");
        }
        Ok(result)
    }

    /// Remove a report. Votes already cast on it are kept as history.
    pub fn delete_report(&self, report_id: ReportId, actor: Option<UserId>) -> CivicResult<Report> {
        let report = self.inner().reports.remove(report_id)?;

        self.record(
            AuditEntry::new(AuditEventType::ReportDeleted, report_id)
                .with_actor(actor)
                .with_detail(report.title.clone()),
        );
        info!(report_id = %report_id, "report deleted");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::provider::DisabledProvider;
    use civic_core::{ReportDraft, VoteType};
    use std::sync::Arc;
    use uuid::Uuid;

    fn setup() -> (VerificationEngine, UserId, ReportId) {
        let engine = VerificationEngine::new(EngineConfig::default(), Arc::new(DisabledProvider));
        let reporter = Uuid::new_v4();
        engine.enroll_user(reporter, "rita").unwrap();
        let report = engine
            .submit_report(reporter, ReportDraft::new("Broken light", "Dark corner", "streetlight"))
            .unwrap();
        (engine, reporter, report.id)
    }

    #[test]
    fn test_approve_then_reject_keeps_verified_flag() {
        let (engine, _, id) = setup();
        let admin = Uuid::new_v4();

        let approved = engine.approve_report(id, Some(admin)).unwrap();
        assert!(approved.changed);
        assert_eq!(approved.report.status, ReportStatus::Verified);

        let rejected = engine.reject_report(id, Some(admin)).unwrap();
        assert_eq!(rejected.previous_status, ReportStatus::Verified);
        assert_eq!(rejected.report.status, ReportStatus::Rejected);
        assert!(rejected.report.verified);

        let stats = engine.audit_stats();
        assert_eq!(stats.admin_approved, 1);
        assert_eq!(stats.admin_rejected, 1);
    }

    #[test]
    fn test_overrides_on_missing_report() {
        let (engine, _, _) = setup();
        let missing = Uuid::new_v4();
        assert!(matches!(engine.approve_report(missing, None), Err(CivicError::NotFound { .. })));
        assert!(matches!(engine.reject_report(missing, None), Err(CivicError::NotFound { .. })));
        assert!(matches!(engine.delete_report(missing, None), Err(CivicError::NotFound { .. })));
    }

    #[test]
    fn test_operational_status_targets() {
        let (engine, _, id) = setup();

        assert!(matches!(
            engine.set_operational_status(id, ReportStatus::Verified, None),
            Err(CivicError::Validation(_))
        ));

        let moved = engine.set_operational_status(id, ReportStatus::InProgress, None).unwrap();
        assert_eq!(moved.report.status, ReportStatus::InProgress);
        assert!(!moved.report.verified);

        engine.set_operational_status(id, ReportStatus::Resolved, None).unwrap();
        assert!(engine.set_operational_status(id, ReportStatus::InProgress, None).is_err());
        assert_eq!(engine.report(id).unwrap().status, ReportStatus::Resolved);
    }

    #[test]
    fn test_rejected_report_cannot_be_worked_on() {
        let (engine, _, id) = setup();
        engine.reject_report(id, None).unwrap();
        assert!(matches!(
            engine.set_operational_status(id, ReportStatus::InProgress, None),
            Err(CivicError::Validation(_))
        ));
    }

    #[test]
    fn test_in_progress_report_ignores_community_rule() {
        let (engine, _, id) = setup();
        engine.set_operational_status(id, ReportStatus::InProgress, None).unwrap();

        for name in ["a", "b", "c"] {
            let voter = Uuid::new_v4();
            engine.enroll_user(voter, name).unwrap();
            let result = engine.cast_vote(voter, id, VoteType::Upvote, None).unwrap();
            assert!(!result.auto_verified);
        }

        let report = engine.report(id).unwrap();
        assert_eq!(report.status, ReportStatus::InProgress);
        assert_eq!(report.upvotes, 3);
        assert!(!report.verified);
    }

    #[test]
    fn test_delete_keeps_votes() {
        let (engine, _, id) = setup();
        let voter = Uuid::new_v4();
        engine.enroll_user(voter, "vic").unwrap();
        engine.cast_vote(voter, id, VoteType::Upvote, None).unwrap();

        engine.delete_report(id, None).unwrap();

        assert!(engine.report(id).is_err());
        assert_eq!(engine.votes_for_report(id).len(), 1);
        assert!(matches!(
            engine.cast_vote(voter, id, VoteType::Upvote, None),
            Err(CivicError::NotFound { .. })
        ));
    }
}
