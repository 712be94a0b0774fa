//! First-usable transport selection

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;
use crate::event::EventBatch;
use crate::transport::Transport;

/// Delegates to the first child that is usable at call time.
pub struct TransportSwitch {
    name: String,
    transports: Vec<Arc<dyn Transport>>,
}

impl TransportSwitch {
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        let names: Vec<&str> = transports.iter().map(|t| t.name()).collect();
        Self {
            name: format!("switch({})", names.join(", ")),
            transports,
        }
    }

    /// The child `handle` would currently use.
    pub fn selected(&self) -> Option<&Arc<dyn Transport>> {
        self.transports.iter().find(|t| t.is_usable())
    }
}

#[async_trait]
impl Transport for TransportSwitch {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.transports.iter().any(|t| t.is_usable())
    }

    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError> {
        let transport = self.selected().ok_or(TransportError::NotUsable)?;
        debug!(transport = %transport.name(), events = batch.len(), "Switch selected transport");
        transport.handle(batch).await
    }
}
