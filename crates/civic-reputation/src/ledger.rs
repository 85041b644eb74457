//! Reputation ledger
//!
//! Experience only grows through award events; the level is derived from
//! experience inside the same locked update, so no reader ever sees the two
//! out of step.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use civic_core::{CivicError, CivicResult, UserId};

use crate::awards::{AwardEvent, AwardTable};

/// Experience needed per level
pub const XP_PER_LEVEL: u64 = 100;

/// `level = floor(xp / 100) + 1`
pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// Points remaining until the next level
pub fn xp_to_next_level(xp: u64) -> u64 {
    XP_PER_LEVEL - xp % XP_PER_LEVEL
}

/// Reputation state of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReputation {
    pub user_id: UserId,
    pub display_name: String,
    pub xp: u64,
    pub level: u64,
    pub enrolled_at: DateTime<Utc>,
}

impl UserReputation {
    fn new(user_id: UserId, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            xp: 0,
            level: level_for_xp(0),
            enrolled_at: Utc::now(),
        }
    }

    fn add_xp(&mut self, amount: u64) {
        self.xp = self.xp.saturating_add(amount);
        self.level = level_for_xp(self.xp);
    }
}

/// Store of per-user reputation, one lock per user
#[derive(Default)]
pub struct UserReputationStore {
    users: RwLock<HashMap<UserId, Mutex<UserReputation>>>,
}

impl UserReputationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enroll(&self, user_id: UserId, display_name: impl Into<String>) -> CivicResult<UserReputation> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(CivicError::validation("display name must not be empty"));
        }

        let mut users = self.users.write();
        match users.entry(user_id) {
            Entry::Occupied(_) => Err(CivicError::validation(format!(
                "user {} is already enrolled",
                user_id
            ))),
            Entry::Vacant(slot) => {
                let state = UserReputation::new(user_id, display_name.trim().to_string());
                slot.insert(Mutex::new(state.clone()));
                Ok(state)
            }
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<UserReputation> {
        self.users.read().get(&user_id).map(|cell| cell.lock().clone())
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.users.read().contains_key(&user_id)
    }

    /// Returns the level held before the credit and the updated state
    fn credit(&self, user_id: UserId, amount: u64) -> CivicResult<(u64, UserReputation)> {
        let users = self.users.read();
        let cell = users.get(&user_id).ok_or_else(|| CivicError::user_not_found(user_id))?;
        let mut state = cell.lock();
        let previous_level = state.level;
        state.add_xp(amount);
        Ok((previous_level, state.clone()))
    }

    pub fn all(&self) -> Vec<UserReputation> {
        self.users.read().values().map(|cell| cell.lock().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a single award
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub amount: u64,
    pub previous_level: u64,
    pub reputation: UserReputation,
}

impl Grant {
    pub fn leveled_up(&self) -> bool {
        self.reputation.level > self.previous_level
    }
}

/// Applies the award table to the reputation store
#[derive(Clone)]
pub struct ReputationLedger {
    store: Arc<UserReputationStore>,
    awards: AwardTable,
}

impl ReputationLedger {
    pub fn new(store: Arc<UserReputationStore>, awards: AwardTable) -> Self {
        Self { store, awards }
    }

    pub fn in_memory(awards: AwardTable) -> Self {
        Self::new(Arc::new(UserReputationStore::new()), awards)
    }

    pub fn awards(&self) -> &AwardTable {
        &self.awards
    }

    pub fn enroll(&self, user_id: UserId, display_name: impl Into<String>) -> CivicResult<UserReputation> {
        let state = self.store.enroll(user_id, display_name)?;
        debug!(user_id = %user_id, "enrolled user in reputation ledger");
        Ok(state)
    }

    pub fn is_enrolled(&self, user_id: UserId) -> bool {
        self.store.contains(user_id)
    }

    pub fn reputation(&self, user_id: UserId) -> CivicResult<UserReputation> {
        self.store.get(user_id).ok_or_else(|| CivicError::user_not_found(user_id))
    }

    /// Add `amount` experience to a user. Negative amounts are rejected.
    pub fn grant_xp(&self, user_id: UserId, amount: i64) -> CivicResult<Grant> {
        let amount = u64::try_from(amount)
            .map_err(|_| CivicError::validation(format!("negative xp award: {}", amount)))?;

        let (previous_level, reputation) = self.store.credit(user_id, amount)?;

        Ok(Grant {
            amount,
            previous_level,
            reputation,
        })
    }

    /// Grant the table amount for `event`
    pub fn award(&self, user_id: UserId, event: AwardEvent) -> CivicResult<Grant> {
        let amount = i64::from(self.awards.amount_for(event));
        let grant = self.grant_xp(user_id, amount)?;
        debug!(
            user_id = %user_id,
            event = %event,
            xp = grant.reputation.xp,
            level = grant.reputation.level,
            "awarded experience"
        );
        Ok(grant)
    }

    /// Top `n` users by experience; ties go to the earlier enrollment
    pub fn leaderboard(&self, n: usize) -> Vec<UserReputation> {
        let mut users = self.store.all();
        users.sort_by(|a, b| {
            b.xp
                .cmp(&a.xp)
                .then_with(|| a.enrolled_at.cmp(&b.enrolled_at))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        users.truncate(n);
        users
    }
}
