//! Retry decorator with exponential backoff.
//!
//! Delay before retry `n` (0-based) is `min_timeout * retry_factor^n`, capped
//! at `max_timeout`. Retrying stops after `max_attempts` attempts or once the
//! time spent since the first attempt reaches `max_retry`, whichever comes
//! first; the last error is then reported as [`TransportError::RetryExhausted`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::event::EventBatch;
use crate::transport::Transport;

/// Backoff policy for [`TransportRetry`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub min_timeout: Duration,
    /// Upper bound for a single delay; unbounded when `None`
    pub max_timeout: Option<Duration>,
    /// Upper bound on time spent retrying one batch; unbounded when `None`
    pub max_retry: Option<Duration>,
    /// Growth factor applied to the delay after every retry
    pub retry_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            min_timeout: Duration::from_millis(1000),
            max_timeout: None,
            max_retry: None,
            retry_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before retry number `retry_index` (0 = first retry).
    pub fn delay_for_retry(&self, retry_index: u32) -> Duration {
        let factor = self
            .retry_factor
            .max(1.0)
            .powi(retry_index.min(i32::MAX as u32) as i32);
        let millis = self.min_timeout.as_millis() as f64 * factor;
        let delay = if millis.is_finite() && millis < u64::MAX as f64 {
            Duration::from_millis(millis as u64)
        } else {
            Duration::MAX
        };
        match self.max_timeout {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    fn attempts_allowed(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// One attempt recorded by [`TransportRetry`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryAttempt {
    /// 1-based attempt number within its `handle` call
    pub attempt: u32,
    /// Backoff waited before this attempt
    pub delay: Duration,
    /// Error returned by the inner transport, `None` on success
    pub error: Option<String>,
}

pub struct TransportRetry {
    name: String,
    inner: Arc<dyn Transport>,
    policy: RetryPolicy,
    attempts: Mutex<Vec<RetryAttempt>>,
}

impl TransportRetry {
    pub fn new(inner: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            name: format!("retry({})", inner.name()),
            inner,
            policy,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Every attempt made so far, across all `handle` calls.
    pub fn attempts(&self) -> Vec<RetryAttempt> {
        self.attempts.lock().clone()
    }

    fn record(&self, attempt: u32, delay: Duration, error: Option<String>) {
        self.attempts.lock().push(RetryAttempt {
            attempt,
            delay,
            error,
        });
    }
}

#[async_trait]
impl Transport for TransportRetry {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.inner.is_usable()
    }

    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError> {
        let started = Instant::now();
        let mut attempt = 0u32;
        let mut delay = Duration::ZERO;

        loop {
            attempt += 1;
            let err = match self.inner.handle(batch).await {
                Ok(()) => {
                    self.record(attempt, delay, None);
                    if attempt > 1 {
                        info!(
                            transport = %self.inner.name(),
                            attempt,
                            events = batch.len(),
                            "Batch delivered after retry"
                        );
                    }
                    return Ok(());
                }
                Err(err) => err,
            };
            self.record(attempt, delay, Some(err.to_string()));

            let budget_spent = self
                .policy
                .max_retry
                .map_or(false, |max_retry| started.elapsed() >= max_retry);
            if attempt >= self.policy.attempts_allowed() || budget_spent {
                warn!(
                    transport = %self.inner.name(),
                    attempts = attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Retry budget exhausted"
                );
                return Err(TransportError::RetryExhausted {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            delay = self.policy.delay_for_retry(attempt - 1);
            debug!(
                transport = %self.inner.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Delivery failed, retrying"
            );
            sleep(delay).await;
        }
    }
}
