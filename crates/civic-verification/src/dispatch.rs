//! AI dispatch: bounded, retried provider calls
//!
//! Every attempt is wrapped in a timeout. Transient failures are retried
//! after a fixed backoff until the attempt budget is spent; whatever is left
//! becomes an [`AiOutcome::Failed`]. The dispatcher never returns an error.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::provider::{AiRequest, AiVerdictProvider, ProviderError};
use crate::verdict::AiOutcome;

/// Upper bound for a health check; shorter verify timeouts win
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct AiDispatcher {
    provider: Arc<dyn AiVerdictProvider>,
    timeout: Duration,
    health_timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl AiDispatcher {
    pub fn new(provider: Arc<dyn AiVerdictProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            health_timeout: timeout.min(HEALTH_CHECK_TIMEOUT),
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Total attempts per request (minimum 1)
    pub fn with_retries(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn with_health_timeout(mut self, bound: Duration) -> Self {
        self.health_timeout = bound;
        self
    }

    /// One bounded call
    async fn attempt(&self, request: &AiRequest) -> Result<AiOutcome, ProviderError> {
        match tokio::time::timeout(self.timeout, self.provider.verify(request)).await {
            Ok(Ok(verdict)) => match AiOutcome::Verdict(verdict).sanitized() {
                AiOutcome::Failed { reason } => Err(ProviderError::Malformed(reason)),
                outcome => Ok(outcome),
            },
            Ok(Err(ProviderError::Timeout(_))) | Err(_) => Err(ProviderError::Timeout(self.timeout)),
            Ok(Err(err)) => Err(err),
        }
    }

    pub async fn dispatch(&self, request: &AiRequest) -> AiOutcome {
        let mut attempt = 1;
        loop {
            match self.attempt(request).await {
                Ok(outcome) => {
                    debug!(
                        report_id = %request.report_id,
                        provider = self.provider.name(),
                        attempt,
                        "classifier answered"
                    );
                    return outcome;
                }
                Err(err) => {
                    warn!(
                        report_id = %request.report_id,
                        provider = self.provider.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "AI verification attempt failed"
                    );
                    if !err.is_transient() || attempt >= self.max_attempts {
                        return AiOutcome::failed(err.to_string());
                    }
                }
            }
            attempt += 1;
            if !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff).await;
            }
        }
    }

    pub async fn healthy(&self) -> bool {
        tokio::time::timeout(self.health_timeout, self.provider.health())
            .await
            .unwrap_or(false)
    }
}
