//! Civic Reputation: experience, levels and leaderboards
//!
//! Reporters and voters earn experience through award events. The level is
//! a pure function of experience.
//!
//! # Example
//!
//! ```
//! use civic_reputation::{AwardEvent, AwardTable, ReputationLedger};
//! use uuid::Uuid;
//!
//! let ledger = ReputationLedger::in_memory(AwardTable::standard());
//! let user = Uuid::new_v4();
//! ledger.enroll(user, "maria").unwrap();
//!
//! ledger.grant_xp(user, 95).unwrap();
//! let grant = ledger.award(user, AwardEvent::ReportSubmitted).unwrap();
//!
//! assert_eq!(grant.reputation.xp, 105);
//! assert_eq!(grant.reputation.level, 2);
//! ```

pub mod awards;
pub mod ledger;

pub use awards::{AwardEvent, AwardTable};
pub use ledger::{
    level_for_xp, xp_to_next_level, Grant, ReputationLedger, UserReputation,
    UserReputationStore, XP_PER_LEVEL,
};
