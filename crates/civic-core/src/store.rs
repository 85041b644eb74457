//! In-memory record stores
//!
//! `ReportStore` locks each report individually so updates to unrelated
//! reports never wait on each other. `VoteStore` is keyed by
//! `(user_id, report_id)`; the key itself is the uniqueness constraint.

use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::data_model::{Report, ReportFilter, ReportId, UserId, Vote, VoteType};
use crate::error::{CivicError, CivicResult};

#[derive(Default)]
pub struct ReportStore {
    reports: RwLock<HashMap<ReportId, Arc<Mutex<Report>>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new report. Ids are never reused.
    pub fn insert(&self, report: Report) -> CivicResult<Report> {
        let mut reports = self.reports.write();
        match reports.entry(report.id) {
            Entry::Occupied(_) => Err(CivicError::validation(format!(
                "report {} already exists",
                report.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(report.clone())));
                Ok(report)
            }
        }
    }

    pub fn get(&self, id: ReportId) -> Option<Report> {
        let reports = self.reports.read();
        reports.get(&id).map(|cell| cell.lock().clone())
    }

    pub fn contains(&self, id: ReportId) -> bool {
        self.reports.read().contains_key(&id)
    }

    /// Atomically update one report.
    ///
    /// The closure runs against a copy while the report's lock is held; the
    /// copy is committed only when the closure returns `Ok`. The map read
    /// guard is kept for the duration so a concurrent `remove` cannot slip
    /// in between lookup and commit.
    pub fn update<T, F>(&self, id: ReportId, f: F) -> CivicResult<T>
    where
        F: FnOnce(&mut Report) -> CivicResult<T>,
    {
        let reports = self.reports.read();
        let cell = reports.get(&id).ok_or_else(|| CivicError::report_not_found(id))?;
        let mut current = cell.lock();

        let mut draft = current.clone();
        let out = f(&mut draft)?;
        debug_assert_eq!(draft.id, current.id);
        debug_assert_eq!(draft.created_at, current.created_at);
        *current = draft;
        Ok(out)
    }

    pub fn remove(&self, id: ReportId) -> CivicResult<Report> {
        let mut reports = self.reports.write();
        let cell = reports.remove(&id).ok_or_else(|| CivicError::report_not_found(id))?;
        let report = cell.lock().clone();
        debug!(report_id = %id, "report removed from store");
        Ok(report)
    }

    /// Matching reports, newest first
    pub fn list(&self, filter: &ReportFilter) -> Vec<Report> {
        let mut out: Vec<Report> = {
            let reports = self.reports.read();
            reports
                .values()
                .map(|cell| cell.lock().clone())
                .filter(|r| filter.matches(r))
                .collect()
        };
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn count_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Report) -> bool,
    {
        let reports = self.reports.read();
        reports.values().filter(|cell| predicate(&*cell.lock())).count()
    }

    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct VoteStore {
    votes: RwLock<HashMap<(UserId, ReportId), Vote>>,
}

impl VoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-insert under one write lock; a second vote for the same
    /// pair fails with `DuplicateVote` and leaves the first untouched.
    pub fn insert(&self, vote: Vote) -> CivicResult<Vote> {
        let mut votes = self.votes.write();
        match votes.entry((vote.user_id, vote.report_id)) {
            Entry::Occupied(_) => Err(CivicError::DuplicateVote {
                user_id: vote.user_id,
                report_id: vote.report_id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(vote.clone());
                Ok(vote)
            }
        }
    }

    /// Undo an insert whose follow-up step failed.
    ///
    /// Only removes the record if the stored vote still has the same id.
    pub fn retract(&self, vote: &Vote) -> bool {
        let mut votes = self.votes.write();
        match votes.entry((vote.user_id, vote.report_id)) {
            Entry::Occupied(slot) if slot.get().id == vote.id => {
                slot.remove();
                debug!(vote_id = %vote.id, report_id = %vote.report_id, "vote retracted");
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, user_id: UserId, report_id: ReportId) -> Option<Vote> {
        self.votes.read().get(&(user_id, report_id)).cloned()
    }

    pub fn contains(&self, user_id: UserId, report_id: ReportId) -> bool {
        self.votes.read().contains_key(&(user_id, report_id))
    }

    /// Votes on a report, oldest first
    pub fn for_report(&self, report_id: ReportId) -> Vec<Vote> {
        self.collect_sorted(|v| v.report_id == report_id)
    }

    /// Votes cast by a user, oldest first
    pub fn by_user(&self, user_id: UserId) -> Vec<Vote> {
        self.collect_sorted(|v| v.user_id == user_id)
    }

    pub fn count(&self, report_id: ReportId, vote_type: VoteType) -> usize {
        self.votes
            .read()
            .values()
            .filter(|v| v.report_id == report_id && v.vote_type == vote_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.votes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect_sorted<P>(&self, predicate: P) -> Vec<Vote>
    where
        P: Fn(&Vote) -> bool,
    {
        let mut out: Vec<Vote> = self
            .votes
            .read()
            .values()
            .filter(|v| predicate(v))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }
}
