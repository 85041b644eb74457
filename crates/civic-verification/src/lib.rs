//! Civic Verification: report lifecycle and auto-verification
//!
//! Reports start pending. Two independent channels can verify them: an
//! external image classifier (AI rule) and community votes (community rule).
//! Both feed a one-way latch; administrators can override either way.
//!
//! # Architecture
//!
//! ```text
//! submit_report ──► pending ──┬── AI dispatch ──► apply_ai_verdict ──┐
//!                             │                                      ├──► verified
//!                             └── cast_vote ──► community rule ──────┘
//!                                                   │
//!                                              reputation xp
//!
//! approve_report / reject_report / set_operational_status ──► audit trail
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use civic_core::{ReportDraft, ReportStatus, VoteType};
//! use civic_verification::{DisabledProvider, EngineConfig, VerificationEngine};
//! use uuid::Uuid;
//!
//! let engine = VerificationEngine::new(EngineConfig::default(), Arc::new(DisabledProvider));
//!
//! let reporter = Uuid::new_v4();
//! engine.enroll_user(reporter, "rita").unwrap();
//! let report = engine
//!     .submit_report(reporter, ReportDraft::new("Flooded underpass", "Knee deep", "flood"))
//!     .unwrap();
//!
//! for name in ["ana", "ben"] {
//!     let voter = Uuid::new_v4();
//!     engine.enroll_user(voter, name).unwrap();
//!     engine.cast_vote(voter, report.id, VoteType::Upvote, None).unwrap();
//! }
//!
//! let report = engine.report(report.id).unwrap();
//! assert_eq!(report.status, ReportStatus::Verified);
//! assert!(report.verified);
//! ```

pub mod admin;
pub mod audit;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod provider;
pub mod rules;
pub mod verdict;

pub use admin::OverrideResult;
pub use audit::{AuditEntry, AuditEventType, AuditLog, AuditStats};
pub use config::{AiSettings, ConfigError, EngineConfig};
pub use dispatch::AiDispatcher;
pub use engine::VerificationEngine;
pub use provider::{
    AiRequest, AiVerdictProvider, DisabledProvider, HttpVerdictProvider, ProviderError,
    ScriptedProvider,
};
pub use rules::{AutoVerifyPolicy, VerificationSource};
pub use verdict::{AiApplication, AiOutcome, AiVerdict, ReportStats, VoteResult, VoteSummary};
