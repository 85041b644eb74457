//! Scripted provider: answers from a queue

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::{AiRequest, AiVerdictProvider, ProviderError};
use crate::verdict::AiVerdict;

#[derive(Debug, Clone)]
enum Step {
    Answer(Result<AiVerdict, ProviderError>),
    /// Sleep before answering
    Delayed(Duration, Result<AiVerdict, ProviderError>),
}

/// Replays queued answers in order; once the queue is empty every call gets
/// the fallback answer.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    fallback: Result<AiVerdict, ProviderError>,
    calls: AtomicUsize,
    healthy: AtomicBool,
    health_delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback: Err(ProviderError::Unreachable("script exhausted".to_string())),
            calls: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
            health_delay: None,
        }
    }

    /// Always answer with `verdict`
    pub fn always(verdict: AiVerdict) -> Self {
        Self::new().with_fallback(Ok(verdict))
    }

    pub fn with_fallback(mut self, answer: Result<AiVerdict, ProviderError>) -> Self {
        self.fallback = answer;
        self
    }

    pub fn then_verdict(self, verdict: AiVerdict) -> Self {
        self.steps.lock().push_back(Step::Answer(Ok(verdict)));
        self
    }

    pub fn then_error(self, error: ProviderError) -> Self {
        self.steps.lock().push_back(Step::Answer(Err(error)));
        self
    }

    /// Answer only after `delay`, which lets callers exercise their timeout
    pub fn then_delayed(self, delay: Duration, answer: Result<AiVerdict, ProviderError>) -> Self {
        self.steps.lock().push_back(Step::Delayed(delay, answer));
        self
    }

    /// Stall every health check for `delay`
    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = Some(delay);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of `verify` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiVerdictProvider for ScriptedProvider {
    async fn verify(&self, _request: &AiRequest) -> Result<AiVerdict, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Answer(answer)) => answer,
            Some(Step::Delayed(delay, answer)) => {
                tokio::time::sleep(delay).await;
                answer
            }
            None => self.fallback.clone(),
        }
    }

    async fn health(&self) -> bool {
        if let Some(delay) = self.health_delay {
            tokio::time::sleep(delay).await;
        }
        self.healthy.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
