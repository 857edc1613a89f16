//! Retry policy.
//!
//! Re-runs a call while it keeps producing handled failures, sleeping
//! between attempts. The sleep is a tokio timer, so only the calling task
//! waits. Successes and unhandled failures return immediately; once the
//! attempts are spent the last handled failure is returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::{retry_delay, BackoffKind};
use crate::resilience::observer::PolicyObserver;
use crate::resilience::outcome::Outcome;

pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffKind,
    base_delay_ms: u64,
    max_delay_ms: u64,
    observer: Arc<dyn PolicyObserver>,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig, observer: Arc<dyn PolicyObserver>) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: config.backoff,
            base_delay_ms: config.delay_ms,
            max_delay_ms: config.max_delay_ms,
            observer,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        retry_delay(self.backoff, attempt, self.base_delay_ms, self.max_delay_ms)
    }

    /// Run `op` until it succeeds, fails unhandled, or retries run out.
    pub async fn execute<F, Fut>(&self, mut op: F) -> Outcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let mut attempt = 0;
        loop {
            let outcome = op().await;
            let failure = match &outcome {
                Outcome::Handled(failure) => failure,
                _ => return outcome,
            };

            if attempt >= self.max_attempts {
                tracing::debug!(attempts = attempt + 1, "Retries exhausted");
                return outcome;
            }

            attempt += 1;
            let delay = self.delay_for(attempt);
            self.observer.on_retry(attempt, delay, failure);
            tokio::time::sleep(delay).await;
        }
    }
}
