//! Data Model: Report, Vote, ReportDraft
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CivicError;

pub type ReportId = Uuid;
pub type UserId = Uuid;
pub type VoteId = Uuid;

/// Prediction label written when the AI channel fails
pub const AI_FAILURE_PREDICTION: &str = "Verification failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pothole,
    Garbage,
    Streetlight,
    Flood,
    Traffic,
    Vandalism,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Pothole,
        Category::Garbage,
        Category::Streetlight,
        Category::Flood,
        Category::Traffic,
        Category::Vandalism,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pothole => "pothole",
            Category::Garbage => "garbage",
            Category::Streetlight => "streetlight",
            Category::Flood => "flood",
            Category::Traffic => "traffic",
            Category::Vandalism => "vandalism",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CivicError::validation(format!("unknown category '{}'", s)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    #[default]
    Moderate,
    Major,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Minor,
        Severity::Moderate,
        Severity::Major,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Severity::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CivicError::validation(format!("unknown severity '{}'", s)))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a report
///
/// ```text
/// pending ──AI rule / community rule / approve──► verified
///    │
///    ├──reject──► rejected
///    └──operational──► in_progress ──► resolved
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
    InProgress,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Pending,
        ReportStatus::Verified,
        ReportStatus::Rejected,
        ReportStatus::InProgress,
        ReportStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ReportStatus::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CivicError::validation(format!("unknown status '{}'", s)))
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl FromStr for VoteType {
    type Err = CivicError;

    /// Accepts `upvote`/`downvote` as well as the short `up`/`down` forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upvote" | "up" => Ok(VoteType::Upvote),
            "downvote" | "down" => Ok(VoteType::Downvote),
            other => Err(CivicError::validation(format!("unknown vote type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CivicError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CivicError::validation(format!(
                "coordinates out of range: ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self { latitude, longitude })
    }
}

/// Caller-supplied input for a new report.
///
/// Category and severity stay raw strings here; they are validated when the
/// draft is turned into a [`Report`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub audio_path: Option<String>,
}

impl ReportDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_image(mut self, path: impl Into<String>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_audio(mut self, path: impl Into<String>) -> Self {
        self.audio_path = Some(path.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Validate the draft and build a pending report owned by `reporter`
    pub fn into_report(self, reporter: UserId) -> Result<Report, CivicError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CivicError::validation("title must not be empty"));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(CivicError::validation("description must not be empty"));
        }
        let category: Category = self.category.parse()?;
        let severity = match self.severity.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse()?,
            _ => Severity::default(),
        };
        let geo = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)?),
            (None, None) => None,
            _ => {
                return Err(CivicError::validation(
                    "latitude and longitude must be given together",
                ))
            }
        };

        Ok(Report {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            category,
            severity,
            status: ReportStatus::Pending,
            geo,
            location: non_blank(self.location),
            image_path: non_blank(self.image_path),
            audio_path: non_blank(self.audio_path),
            ai_verified: false,
            ai_confidence: None,
            ai_prediction: None,
            upvotes: 0,
            downvotes: 0,
            verified: false,
            created_at: Utc::now(),
            reporter,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    pub ai_verified: bool,
    pub ai_confidence: Option<f64>,
    pub ai_prediction: Option<String>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub reporter: UserId,
}

impl Report {
    /// Compare-and-set on the verification latch for automatic rules.
    ///
    /// Only a pending report moves; returns `true` when this call performed
    /// the transition.
    pub fn latch_verified(&mut self) -> bool {
        if self.status != ReportStatus::Pending {
            return false;
        }
        self.status = ReportStatus::Verified;
        self.verified = true;
        true
    }

    /// Unconditional verification (administrative approval)
    pub fn force_verified(&mut self) -> bool {
        let changed = self.status != ReportStatus::Verified || !self.verified;
        self.status = ReportStatus::Verified;
        self.verified = true;
        changed
    }

    pub fn record_vote(&mut self, vote: VoteType) {
        match vote {
            VoteType::Upvote => self.upvotes = self.upvotes.saturating_add(1),
            VoteType::Downvote => self.downvotes = self.downvotes.saturating_add(1),
        }
    }

    pub fn has_location(&self) -> bool {
        self.geo.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub user_id: UserId,
    pub report_id: ReportId,
    pub vote_type: VoteType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        user_id: UserId,
        report_id: ReportId,
        vote_type: VoteType,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            report_id,
            vote_type,
            comment: non_blank(comment),
            created_at: Utc::now(),
        }
    }
}

/// Read-side filter for report listings; unset fields match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
    pub reporter: Option<UserId>,
}

impl ReportFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn reporter(mut self, reporter: UserId) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn matches(&self, report: &Report) -> bool {
        self.status.map_or(true, |s| report.status == s)
            && self.category.map_or(true, |c| report.category == c)
            && self.severity.map_or(true, |s| report.severity == s)
            && self.reporter.map_or(true, |r| report.reporter == r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_wire_format() {
        let report = ReportDraft::new("Pothole", "Deep", "pothole")
            .with_severity("critical")
            .into_report(Uuid::new_v4())
            .unwrap();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["ai_confidence"], serde_json::Value::Null);
        assert!(value.get("geo").is_none());

        let vote = serde_json::to_value(Vote::new(report.reporter, report.id, VoteType::Downvote, None)).unwrap();
        assert_eq!(vote["vote_type"], "downvote");
    }

    #[test]
    fn test_category_parse_case_insensitive() {
        assert_eq!("POTHOLE".parse::<Category>().unwrap(), Category::Pothole);
        assert_eq!("flood".parse::<Category>().unwrap(), Category::Flood);
        assert!(matches!(
            "BRIDGE".parse::<Category>(),
            Err(CivicError::Validation(_))
        ));
    }

    #[test]
    fn test_draft_defaults() {
        let reporter = Uuid::new_v4();
        let report = ReportDraft::new("Hole", "Big hole on Main St", "pothole")
            .into_report(reporter)
            .unwrap();

        assert_eq!(report.severity, Severity::Moderate);
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(!report.verified);
        assert!(!report.ai_verified);
        assert_eq!((report.upvotes, report.downvotes), (0, 0));
        assert_eq!(report.reporter, reporter);
    }

    #[test]
    fn test_draft_rejects_blank_fields() {
        let reporter = Uuid::new_v4();
        assert!(ReportDraft::new("  ", "desc", "garbage").into_report(reporter).is_err());
        assert!(ReportDraft::new("title", "", "garbage").into_report(reporter).is_err());
        assert!(ReportDraft::new("title", "desc", "garbage")
            .with_severity("apocalyptic")
            .into_report(reporter)
            .is_err());
    }

    #[test]
    fn test_draft_requires_both_coordinates() {
        let mut draft = ReportDraft::new("t", "d", "traffic");
        draft.latitude = Some(10.0);
        assert!(draft.into_report(Uuid::new_v4()).is_err());

        let report = ReportDraft::new("t", "d", "traffic")
            .with_coordinates(12.97, 77.59)
            .into_report(Uuid::new_v4())
            .unwrap();
        assert!(report.has_location());
    }

    #[test]
    fn test_latch_only_moves_pending() {
        let mut report = ReportDraft::new("t", "d", "other")
            .into_report(Uuid::new_v4())
            .unwrap();
        assert!(report.latch_verified());
        assert!(!report.latch_verified());
        assert!(report.verified);

        let mut rejected = ReportDraft::new("t", "d", "other")
            .into_report(Uuid::new_v4())
            .unwrap();
        rejected.status = ReportStatus::Rejected;
        assert!(!rejected.latch_verified());
        assert!(!rejected.verified);
    }

    #[test]
    fn test_vote_type_short_forms() {
        assert_eq!("up".parse::<VoteType>().unwrap(), VoteType::Upvote);
        assert_eq!("DOWNVOTE".parse::<VoteType>().unwrap(), VoteType::Downvote);
        assert!("sideways".parse::<VoteType>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let reporter = Uuid::new_v4();
        let report = ReportDraft::new("t", "d", "garbage")
            .with_severity("major")
            .into_report(reporter)
            .unwrap();

        assert!(ReportFilter::new().matches(&report));
        assert!(ReportFilter::new()
            .category(Category::Garbage)
            .severity(Severity::Major)
            .reporter(reporter)
            .matches(&report));
        assert!(!ReportFilter::new().status(ReportStatus::Verified).matches(&report));
    }
}
