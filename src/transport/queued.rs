//! Hand batches to a [`TrackerQueue`] instead of delivering them directly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::event::EventBatch;
use crate::queue::TrackerQueue;
use crate::transport::Transport;

/// Transport whose `handle` stores each event in a tracker queue.
///
/// Success means the events are queued, not delivered. The queue owns the
/// delivery transport and holds dispatch back while it is unusable, so this
/// transport always accepts events.
pub struct QueuedTransport {
    name: String,
    queue: Arc<TrackerQueue>,
}

impl QueuedTransport {
    pub fn new(queue: Arc<TrackerQueue>) -> Self {
        Self {
            name: format!("queued({})", queue.transport().name()),
            queue,
        }
    }

    pub fn queue(&self) -> &Arc<TrackerQueue> {
        &self.queue
    }
}

#[async_trait]
impl Transport for QueuedTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        true
    }

    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError> {
        self.queue.push_batch(batch.events())?;
        Ok(())
    }
}
