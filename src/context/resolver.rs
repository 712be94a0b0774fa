//! Context resolution
//!
//! Turns a list of [`ResolvableContext`] into concrete [`Context`] values. Every
//! failure is contained per slot: a deferred value that errors or misses the
//! timeout, or a factory that errors, is replaced by an error context. The
//! output always has the input's length and order.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::context::record::{Context, TIMEOUT_MESSAGE};
use crate::context::resolvable::ResolvableContext;

/// Default upper bound on how long a single deferred context may take
pub const DEFAULT_PROMISE_TIMEOUT: Duration = Duration::from_millis(5000);

// Placeholder for slots that are filled in once their computation settles.
const UNRESOLVED_MESSAGE: &str = "unresolved";

#[derive(Debug, Clone, Copy)]
pub struct ContextResolver {
    timeout: Duration,
}

impl Default for ContextResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PROMISE_TIMEOUT)
    }
}

impl ContextResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve every entry. Deferred entries are raced against the timeout
    /// concurrently; factories run after all deferred entries have settled.
    pub async fn resolve(&self, contexts: Vec<ResolvableContext>) -> Vec<Context> {
        let mut resolved = Vec::with_capacity(contexts.len());
        let mut deferred = Vec::new();
        let mut factories = Vec::new();

        for (index, entry) in contexts.into_iter().enumerate() {
            match entry {
                ResolvableContext::Value(context) => resolved.push(context),
                ResolvableContext::Deferred(future) => {
                    resolved.push(Context::error(UNRESOLVED_MESSAGE));
                    deferred.push((index, future));
                }
                ResolvableContext::Factory(factory) => {
                    resolved.push(Context::error(UNRESOLVED_MESSAGE));
                    factories.push((index, factory));
                }
            }
        }

        if !deferred.is_empty() {
            debug!(
                count = deferred.len(),
                timeout_ms = self.timeout.as_millis() as u64,
                "Resolving deferred contexts"
            );
        }

        let timeout = self.timeout;
        let settled = join_all(deferred.into_iter().map(|(index, future)| async move {
            let context = match tokio::time::timeout(timeout, future).await {
                Ok(Ok(context)) => context,
                Ok(Err(err)) => {
                    warn!(index, error = %err, "Deferred context failed");
                    Context::error(err.to_string())
                }
                Err(_) => {
                    warn!(
                        index,
                        timeout_ms = timeout.as_millis() as u64,
                        "Deferred context timed out"
                    );
                    Context::error(TIMEOUT_MESSAGE)
                }
            };
            (index, context)
        }))
        .await;

        for (index, context) in settled {
            resolved[index] = context;
        }

        for (index, factory) in factories {
            resolved[index] = match factory() {
                Ok(context) => context,
                Err(err) => {
                    warn!(index, error = %err, "Context factory failed");
                    Context::error(err.to_string())
                }
            };
        }

        resolved
    }
}
