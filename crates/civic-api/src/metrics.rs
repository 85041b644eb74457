//! Prometheus registry served at `/metrics`
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use civic_verification::AuditStats;

pub struct ApiMetrics {
    registry: Registry,
    pub http_requests: IntCounterVec,
    pub reports_submitted: IntCounter,
    pub votes_accepted: IntCounter,
    pub duplicate_votes: IntCounter,
    verified_by_source: IntGaugeVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("civic_http_requests_total", "HTTP requests by method and status"),
            &["method", "status"],
        )?;
        let reports_submitted =
            IntCounter::new("civic_reports_submitted_total", "Reports accepted")?;
        let votes_accepted = IntCounter::new("civic_votes_accepted_total", "Votes recorded")?;
        let duplicate_votes = IntCounter::new(
            "civic_duplicate_votes_total",
            "Votes rejected because the user already voted",
        )?;
        let verified_by_source = IntGaugeVec::new(
            Opts::new(
                "civic_reports_verified",
                "Verifications in the retained audit trail, by source",
            ),
            &["source"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(reports_submitted.clone()))?;
        registry.register(Box::new(votes_accepted.clone()))?;
        registry.register(Box::new(duplicate_votes.clone()))?;
        registry.register(Box::new(verified_by_source.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            reports_submitted,
            votes_accepted,
            duplicate_votes,
            verified_by_source,
        })
    }

    /// Refresh gauges derived from the audit trail
    pub fn observe_audit(&self, stats: &AuditStats) {
        let set = |source: &str, value: usize| {
            self.verified_by_source
                .with_label_values(&[source])
                .set(i64::try_from(value).unwrap_or(i64::MAX));
        };
        set("ai", stats.auto_verified_ai);
        set("community", stats.auto_verified_community);
        set("admin", stats.admin_approved);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
