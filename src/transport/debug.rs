//! Debug sink: logs every event it receives.

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;
use crate::event::EventBatch;
use crate::location::location_path;
use crate::transport::Transport;

#[derive(Debug, Default, Clone, Copy)]
pub struct DebugTransport;

impl DebugTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for DebugTransport {
    fn name(&self) -> &str {
        "debug"
    }

    fn is_usable(&self) -> bool {
        true
    }

    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError> {
        for event in batch {
            debug!(
                event_type = %event.event_type(),
                event_id = %event.id(),
                location = %location_path(event.location_stack()),
                global_contexts = event.global_contexts().len(),
                "Tracked event"
            );
        }
        Ok(())
    }
}
