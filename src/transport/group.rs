//! Fan-out to several independent sinks

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::event::EventBatch;
use crate::transport::Transport;

/// Sends each batch to every usable child concurrently.
///
/// Any child failure fails the group, but children that succeeded are not
/// rolled back. Children that are not usable at call time are skipped.
pub struct TransportGroup {
    name: String,
    transports: Vec<Arc<dyn Transport>>,
}

impl TransportGroup {
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        let names: Vec<&str> = transports.iter().map(|t| t.name()).collect();
        Self {
            name: format!("group({})", names.join(", ")),
            transports,
        }
    }
}

#[async_trait]
impl Transport for TransportGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.transports.iter().any(|t| t.is_usable())
    }

    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError> {
        let usable: Vec<&Arc<dyn Transport>> =
            self.transports.iter().filter(|t| t.is_usable()).collect();
        if usable.is_empty() {
            return Err(TransportError::NotUsable);
        }

        let results = join_all(usable.iter().map(|t| t.handle(batch))).await;

        let errors: Vec<String> = usable
            .iter()
            .zip(results)
            .filter_map(|(transport, result)| {
                result.err().map(|err| {
                    warn!(transport = %transport.name(), error = %err, "Grouped transport failed");
                    format!("{}: {}", transport.name(), err)
                })
            })
            .collect();

        if errors.is_empty() {
            debug!(sinks = usable.len(), events = batch.len(), "Group delivered batch");
            Ok(())
        } else {
            Err(TransportError::GroupFailed {
                failed: errors.len(),
                total: usable.len(),
                errors,
            })
        }
    }
}
