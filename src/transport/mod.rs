//! Transport Abstraction
//!
//! A transport is anything that can take a non-empty batch of resolved events
//! and attempt to deliver it. Composites ([`TransportRetry`],
//! [`TransportSwitch`], [`TransportGroup`], [`QueuedTransport`]) expose the
//! same contract as the primitives they wrap.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::event::EventBatch;

pub mod debug;
pub mod group;
pub mod http;
pub mod queued;
pub mod retry;
pub mod switch;

pub use debug::DebugTransport;
pub use group::TransportGroup;
pub use http::HttpTransport;
pub use queued::QueuedTransport;
pub use retry::{RetryAttempt, RetryPolicy, TransportRetry};
pub use switch::TransportSwitch;

/// Delivery capability
#[async_trait]
pub trait Transport: Send + Sync {
    /// Name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Whether the transport can currently be used. Evaluated on every call.
    fn is_usable(&self) -> bool;

    /// Attempt delivery of the whole batch; success or failure is per batch.
    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError>;
}
