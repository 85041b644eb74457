//! Verification engine
//!
//! Owns the report lifecycle. All writes to report status, the verified
//! latch, vote tallies and experience go through here.
//!
//! ```text
//! submit ──► ReportStore (pending) ──► award xp ──► spawn AI dispatch
//!                                                        │
//!                              apply_ai_verdict ◄────────┘
//!
//! cast_vote ──► VoteStore (unique per user/report)
//!           ──► ReportStore::update (tally + community rule, one lock)
//!           ──► award xp
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use civic_core::{
    CivicError, CivicResult, Report, ReportDraft, ReportFilter, ReportId, ReportStatus,
    ReportStore, Severity, UserId, Vote, VoteStore, VoteType, AI_FAILURE_PREDICTION,
};
use civic_reputation::{AwardEvent, ReputationLedger, UserReputation, UserReputationStore};

use crate::audit::{AuditEntry, AuditEventType, AuditLog, AuditStats};
use crate::config::EngineConfig;
use crate::dispatch::AiDispatcher;
use crate::provider::{
    AiRequest, AiVerdictProvider, DisabledProvider, HttpVerdictProvider, ProviderError,
};
use crate::rules::{AutoVerifyPolicy, VerificationSource};
use crate::verdict::{AiApplication, AiOutcome, ReportStats, VoteResult, VoteSummary};

const NO_RUNTIME: &str = "no async runtime";

/// Cheap to clone; clones share all state
#[derive(Clone)]
pub struct VerificationEngine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) reports: Arc<ReportStore>,
    pub(crate) votes: Arc<VoteStore>,
    pub(crate) ledger: ReputationLedger,
    pub(crate) policy: AutoVerifyPolicy,
    pub(crate) dispatcher: AiDispatcher,
    pub(crate) audit: Mutex<AuditLog>,
    inflight: Mutex<Vec<JoinHandle<()>>>,
}

impl VerificationEngine {
    /// Engine over fresh in-memory stores
    pub fn new(config: EngineConfig, provider: Arc<dyn AiVerdictProvider>) -> Self {
        Self::with_stores(
            config,
            provider,
            Arc::new(ReportStore::new()),
            Arc::new(VoteStore::new()),
            Arc::new(UserReputationStore::new()),
        )
    }

    pub fn with_stores(
        config: EngineConfig,
        provider: Arc<dyn AiVerdictProvider>,
        reports: Arc<ReportStore>,
        votes: Arc<VoteStore>,
        users: Arc<UserReputationStore>,
    ) -> Self {
        let dispatcher = AiDispatcher::new(provider, config.ai.timeout())
            .with_retries(config.ai.max_attempts, config.ai.retry_backoff());
        let audit = match config.audit_capacity {
            Some(max) => AuditLog::with_max_entries(max),
            None => AuditLog::new(),
        };

        Self {
            inner: Arc::new(EngineInner {
                reports,
                votes,
                ledger: ReputationLedger::new(users, config.awards.clone()),
                policy: config.auto_verify,
                dispatcher,
                audit: Mutex::new(audit),
                inflight: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Engine wired to the HTTP classifier when `ai.service_url` is set
    pub fn from_config(config: EngineConfig) -> Result<Self, ProviderError> {
        let provider: Arc<dyn AiVerdictProvider> = match &config.ai.service_url {
            Some(url) => {
                info!(url = %url, "AI verification enabled");
                Arc::new(HttpVerdictProvider::new(
                    url.clone(),
                    config.ai.upload_root.clone(),
                    config.ai.timeout(),
                )?)
            }
            None => {
                warn!("no AI service configured; image reports rely on community votes");
                Arc::new(DisabledProvider)
            }
        };
        Ok(Self::new(config, provider))
    }

    pub(crate) fn inner(&self) -> &EngineInner {
        &self.inner
    }

    pub(crate) fn record(&self, entry: AuditEntry) {
        self.inner.audit.lock().log(entry);
    }

    pub fn ledger(&self) -> &ReputationLedger {
        &self.inner.ledger
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    /// Validate and persist a new pending report, award the reporter, and
    /// hand image evidence to the AI channel without waiting for it.
    pub fn submit_report(&self, reporter: UserId, draft: ReportDraft) -> CivicResult<Report> {
        if !self.inner.ledger.is_enrolled(reporter) {
            return Err(CivicError::user_not_found(reporter));
        }
        let report = self.inner.reports.insert(draft.into_report(reporter)?)?;

        if let Err(err) = self.inner.ledger.award(reporter, AwardEvent::ReportSubmitted) {
            // keep submission all-or-nothing
            let _ = self.inner.reports.remove(report.id);
            return Err(err);
        }

        self.record(
            AuditEntry::new(AuditEventType::ReportSubmitted, report.id).with_actor(Some(reporter)),
        );
        info!(
            report_id = %report.id,
            reporter = %reporter,
            category = %report.category,
            severity = %report.severity,
            "report submitted"
        );

        if let Some(request) = AiRequest::for_report(&report) {
            self.spawn_ai_verification(request);
        }
        Ok(report)
    }

    fn spawn_ai_verification(&self, request: AiRequest) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(report_id = %request.report_id, "no async runtime; AI verification skipped");
                if let Err(err) = self.apply_ai_verdict(request.report_id, AiOutcome::failed(NO_RUNTIME)) {
                    warn!(report_id = %request.report_id, error = %err, "AI failure not recorded");
                }
                return;
            }
        };

        let engine = self.clone();
        let handle = runtime.spawn(async move {
            let outcome = engine.inner.dispatcher.dispatch(&request).await;
            if let Err(err) = engine.apply_ai_verdict(request.report_id, outcome) {
                // report deleted while the classifier was working
                warn!(report_id = %request.report_id, error = %err, "AI verdict dropped");
            }
        });

        let mut inflight = self.inner.inflight.lock();
        inflight.retain(|h| !h.is_finished());
        inflight.push(handle);
    }

    /// Wait until every AI verification dispatched so far has been applied
    pub async fn wait_for_ai(&self) {
        loop {
            let pending = std::mem::take(&mut *self.inner.inflight.lock());
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(err) = handle.await {
                    warn!(error = %err, "AI verification task aborted");
                }
            }
        }
    }

    pub async fn ai_healthy(&self) -> bool {
        self.inner.dispatcher.healthy().await
    }

    // ========================================================================
    // AI CHANNEL
    // ========================================================================

    /// Write an AI outcome onto a report and run the AI rule.
    ///
    /// Failures write the default "unverified" fields and never touch status.
    pub fn apply_ai_verdict(&self, report_id: ReportId, outcome: AiOutcome) -> CivicResult<AiApplication> {
        let outcome = outcome.sanitized();
        let policy = self.inner.policy;

        let (application, from) = self.inner.reports.update(report_id, |report| {
            let from = report.status;
            match &outcome {
                AiOutcome::Verdict(verdict) => {
                    report.ai_verified = verdict.verified;
                    report.ai_confidence = Some(verdict.confidence);
                    report.ai_prediction = Some(verdict.prediction.clone());
                }
                AiOutcome::Failed { .. } => {
                    report.ai_verified = false;
                    report.ai_confidence = Some(0.0);
                    report.ai_prediction = Some(AI_FAILURE_PREDICTION.to_string());
                }
            }
            let auto_verified = policy.ai_rule_fires(report) && report.latch_verified();
            Ok((
                AiApplication {
                    report: report.clone(),
                    auto_verified,
                },
                from,
            ))
        })?;

        match &outcome {
            AiOutcome::Verdict(verdict) => {
                self.record(
                    AuditEntry::new(AuditEventType::AiVerdictApplied, report_id).with_detail(format!(
                        "verified={} confidence={:.3} prediction={}",
                        verdict.verified, verdict.confidence, verdict.prediction
                    )),
                );
                info!(
                    report_id = %report_id,
                    ai_verified = verdict.verified,
                    confidence = verdict.confidence,
                    "AI verdict applied"
                );
            }
            AiOutcome::Failed { reason } => {
                self.record(
                    AuditEntry::new(AuditEventType::AiVerificationFailed, report_id)
                        .with_detail(reason.clone()),
                );
                warn!(report_id = %report_id, reason = %reason, "AI verification failed");
            }
        }

        if application.auto_verified {
            self.record_auto_verified(report_id, from, VerificationSource::Ai, None);
        }
        Ok(application)
    }

    // ========================================================================
    // COMMUNITY CHANNEL
    // ========================================================================

    /// Record one user's vote on a report.
    ///
    /// The vote insert is the uniqueness check; the tally and the community
    /// rule run inside a single report update.
    ///
    /// Readers are eventually consistent across those two steps: for a short
    /// window [`vote_summary`](Self::vote_summary) can report `has_voted`
    /// while the tallies do not yet include the vote. If the report is
    /// deleted inside that window the vote is retracted and never counted.
    pub fn cast_vote(
        &self,
        user_id: UserId,
        report_id: ReportId,
        vote_type: VoteType,
        comment: Option<String>,
    ) -> CivicResult<VoteResult> {
        if !self.inner.reports.contains(report_id) {
            return Err(CivicError::report_not_found(report_id));
        }
        if !self.inner.ledger.is_enrolled(user_id) {
            return Err(CivicError::user_not_found(user_id));
        }

        let vote = self
            .inner
            .votes
            .insert(Vote::new(user_id, report_id, vote_type, comment))
            .map_err(|err| {
                debug!(user_id = %user_id, report_id = %report_id, "duplicate vote rejected");
                err
            })?;

        let policy = self.inner.policy;
        let tally = self.inner.reports.update(report_id, |report| {
            let from = report.status;
            report.record_vote(vote_type);
            let auto_verified = policy.community_rule_fires(report) && report.latch_verified();
            Ok((report.upvotes, report.downvotes, report.status, from, auto_verified))
        });
        let (upvotes, downvotes, status, from, auto_verified) = match tally {
            Ok(t) => t,
            Err(err) => {
                // report vanished between the existence check and the tally
                self.inner.votes.retract(&vote);
                return Err(err);
            }
        };

        // Users are never removed from the ledger, so this award cannot miss.
        let grant = self.inner.ledger.award(user_id, AwardEvent::VoteCast)?;

        info!(
            report_id = %report_id,
            user_id = %user_id,
            vote = ?vote_type,
            upvotes,
            downvotes,
            "vote recorded"
        );
        if auto_verified {
            self.record_auto_verified(report_id, from, VerificationSource::Community, Some(user_id));
        }

        Ok(VoteResult {
            vote,
            upvotes,
            downvotes,
            status,
            auto_verified,
            xp_earned: grant.amount,
            reputation: grant.reputation,
        })
    }

    fn record_auto_verified(
        &self,
        report_id: ReportId,
        from: ReportStatus,
        source: VerificationSource,
        actor: Option<UserId>,
    ) {
        self.record(
            AuditEntry::new(AuditEventType::AutoVerified, report_id)
                .with_actor(actor)
                .with_transition(from, ReportStatus::Verified)
                .with_source(source),
        );
        info!(report_id = %report_id, source = %source, "report auto-verified");
    }

    // ========================================================================
    // READ ACCESSORS
    // ========================================================================

    pub fn report(&self, report_id: ReportId) -> CivicResult<Report> {
        self.inner
            .reports
            .get(report_id)
            .ok_or_else(|| CivicError::report_not_found(report_id))
    }

    /// Matching reports, newest first
    pub fn reports(&self, filter: &ReportFilter) -> Vec<Report> {
        self.inner.reports.list(filter)
    }

    pub fn pending_reports(&self) -> Vec<Report> {
        self.reports(&ReportFilter::new().status(ReportStatus::Pending))
    }

    pub fn verified_reports(&self) -> Vec<Report> {
        self.reports(&ReportFilter::new().status(ReportStatus::Verified))
    }

    /// Reports carrying coordinates, for map views
    pub fn reports_with_location(&self, filter: &ReportFilter) -> Vec<Report> {
        self.reports(filter).into_iter().filter(Report::has_location).collect()
    }

    pub fn count_by_status(&self, status: ReportStatus) -> usize {
        self.inner.reports.count_where(|r| r.status == status)
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.inner.reports.count_where(|r| r.severity == severity)
    }

    pub fn stats(&self) -> ReportStats {
        let by_status: BTreeMap<String, usize> = ReportStatus::ALL
            .iter()
            .map(|s| (s.to_string(), self.count_by_status(*s)))
            .collect();
        let by_severity: BTreeMap<String, usize> = Severity::ALL
            .iter()
            .map(|s| (s.to_string(), self.count_by_severity(*s)))
            .collect();

        ReportStats {
            total: self.inner.reports.len(),
            by_status,
            by_severity,
        }
    }

    pub fn votes_for_report(&self, report_id: ReportId) -> Vec<Vote> {
        self.inner.votes.for_report(report_id)
    }

    pub fn votes_by_user(&self, user_id: UserId) -> Vec<Vote> {
        self.inner.votes.by_user(user_id)
    }

    pub fn user_vote(&self, user_id: UserId, report_id: ReportId) -> Option<Vote> {
        self.inner.votes.get(user_id, report_id)
    }

    pub fn has_voted(&self, user_id: UserId, report_id: ReportId) -> bool {
        self.inner.votes.contains(user_id, report_id)
    }

    /// Tallies plus the viewer's own vote, if any
    pub fn vote_summary(&self, report_id: ReportId, viewer: Option<UserId>) -> CivicResult<VoteSummary> {
        let report = self.report(report_id)?;
        let user_vote = viewer
            .and_then(|user| self.user_vote(user, report_id))
            .map(|v| v.vote_type);

        Ok(VoteSummary {
            report_id,
            upvotes: report.upvotes,
            downvotes: report.downvotes,
            has_voted: user_vote.is_some(),
            user_vote,
        })
    }

    // ========================================================================
    // REPUTATION
    // ========================================================================

    pub fn enroll_user(&self, user_id: UserId, display_name: impl Into<String>) -> CivicResult<UserReputation> {
        self.inner.ledger.enroll(user_id, display_name)
    }

    pub fn reputation(&self, user_id: UserId) -> CivicResult<UserReputation> {
        self.inner.ledger.reputation(user_id)
    }

    pub fn leaderboard(&self, n: usize) -> Vec<UserReputation> {
        self.inner.ledger.leaderboard(n)
    }

    // ========================================================================
    // AUDIT
    // ========================================================================

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.audit.lock().entries().cloned().collect()
    }

    pub fn audit_for_report(&self, report_id: ReportId) -> Vec<AuditEntry> {
        self.inner
            .audit
            .lock()
            .entries_for_report(report_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn audit_by_actor(&self, actor: UserId) -> Vec<AuditEntry> {
        self.inner
            .audit
            .lock()
            .entries_by_actor(actor)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn audit_since(&self, since: DateTime<Utc>) -> Vec<AuditEntry> {
        self.inner
            .audit
            .lock()
            .entries_since(since)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Whole retained trail, one JSON object per line
    pub fn audit_jsonl(&self) -> String {
        self.inner.audit.lock().to_jsonl()
    }

    pub fn audit_stats(&self) -> AuditStats {
        self.inner.audit.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn engine() -> VerificationEngine {
        VerificationEngine::new(EngineConfig::default(), Arc::new(DisabledProvider))
    }

    fn enrolled(engine: &VerificationEngine, name: &str) -> UserId {
        let id = Uuid::new_v4();
        engine.enroll_user(id, name).unwrap();
        id
    }

    fn pothole() -> ReportDraft {
        ReportDraft::new("Pothole on Elm", "Axle-breaking hole near the school", "pothole")
    }

    #[test]
    fn test_submit_awards_reporter() {
        let engine = engine();
        let reporter = enrolled(&engine, "rita");

        let report = engine.submit_report(reporter, pothole()).unwrap();

        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(engine.reputation(reporter).unwrap().xp, 10);
        assert_eq!(engine.report(report.id).unwrap(), report);
    }

    #[test]
    fn test_submit_unknown_category_persists_nothing() {
        let engine = engine();
        let reporter = enrolled(&engine, "rita");

        let err = engine
            .submit_report(reporter, ReportDraft::new("Bridge", "Cracked", "BRIDGE"))
            .unwrap_err();

        assert!(matches!(err, CivicError::Validation(_)));
        assert!(engine.reports(&ReportFilter::new()).is_empty());
        assert_eq!(engine.reputation(reporter).unwrap().xp, 0);
    }

    #[test]
    fn test_submit_unknown_reporter() {
        let engine = engine();
        let err = engine.submit_report(Uuid::new_v4(), pothole()).unwrap_err();
        assert!(matches!(err, CivicError::NotFound { entity: "user", .. }));
        assert!(engine.reports(&ReportFilter::new()).is_empty());
    }

    #[test]
    fn test_submit_without_runtime_records_ai_failure() {
        let engine = engine();
        let reporter = enrolled(&engine, "rita");

        let report = engine
            .submit_report(reporter, pothole().with_image("images/hole.jpg"))
            .unwrap();

        let stored = engine.report(report.id).unwrap();
        assert_eq!(stored.status, ReportStatus::Pending);
        assert!(!stored.ai_verified);
        assert_eq!(stored.ai_confidence, Some(0.0));
        assert_eq!(stored.ai_prediction.as_deref(), Some(AI_FAILURE_PREDICTION));

        let failures: Vec<_> = engine
            .audit_for_report(report.id)
            .into_iter()
            .filter(|e| e.event_type == AuditEventType::AiVerificationFailed)
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].detail.as_deref(), Some(NO_RUNTIME));
    }

    #[test]
    fn test_submit_without_image_leaves_ai_fields_empty() {
        let engine = engine();
        let reporter = enrolled(&engine, "rita");

        let report = engine.submit_report(reporter, pothole()).unwrap();

        let stored = engine.report(report.id).unwrap();
        assert_eq!(stored.ai_confidence, None);
        assert_eq!(stored.ai_prediction, None);
    }

    #[test]
    fn test_audit_queries() {
        let engine = engine();
        let reporter = enrolled(&engine, "rita");
        let admin = Uuid::new_v4();
        let before = chrono::Utc::now();
        let report = engine.submit_report(reporter, pothole()).unwrap();
        engine.approve_report(report.id, Some(admin)).unwrap();

        assert_eq!(engine.audit_by_actor(admin).len(), 1);
        assert_eq!(engine.audit_by_actor(reporter).len(), 1);
        assert_eq!(engine.audit_since(before).len(), 2);
        assert!(engine.audit_since(chrono::Utc::now() + chrono::Duration::hours(1)).is_empty());

        let lines: Vec<_> = engine.audit_jsonl().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("report_submitted"));
    }

    #[test]
    fn test_vote_summary_for_viewer() {
        let engine = engine();
        let reporter = enrolled(&engine, "rita");
        let voter = enrolled(&engine, "vic");
        let report = engine.submit_report(reporter, pothole()).unwrap();

        engine
            .cast_vote(voter, report.id, VoteType::Downvote, Some("not there".into()))
            .unwrap();

        let mine = engine.vote_summary(report.id, Some(voter)).unwrap();
        assert!(mine.has_voted);
        assert_eq!(mine.user_vote, Some(VoteType::Downvote));
        assert_eq!(mine.downvotes, 1);

        let anon = engine.vote_summary(report.id, None).unwrap();
        assert!(!anon.has_voted);
        assert_eq!(anon.user_vote, None);
    }

    #[test]
    fn test_stats_counts() {
        let engine = engine();
        let reporter = enrolled(&engine, "rita");
        engine.submit_report(reporter, pothole()).unwrap();
        engine
            .submit_report(reporter, pothole().with_severity("critical"))
            .unwrap();

        let stats = engine.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_status["verified"], 0);
        assert_eq!(stats.by_severity["critical"], 1);
        assert_eq!(stats.by_severity["moderate"], 1);
    }
}
