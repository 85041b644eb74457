//! Civic Core: data model, error taxonomy and record stores
//!
//! Shared by the reputation ledger, the verification engine and the API.

pub mod data_model;
pub mod error;
pub mod store;

pub use data_model::{
    Category, GeoPoint, Report, ReportDraft, ReportFilter, ReportId, ReportStatus, Severity,
    UserId, Vote, VoteId, VoteType, AI_FAILURE_PREDICTION,
};
pub use error::{CivicError, CivicResult};
pub use store::{ReportStore, VoteStore};
