//! HTTP collector transport
//!
//! POSTs each batch as `{"events": [...], "time": <epoch ms>}` to the collector
//! endpoint. Any non-2xx response fails the whole batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::TransportError;
use crate::event::{EventBatch, TrackerEvent};
use crate::transport::Transport;
use crate::types::now_millis;

const COLLECTOR_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const COLLECTOR_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct CollectorPayload<'a> {
    events: &'a [TrackerEvent],
    time: u64,
}

// Helper function to map HTTP errors to TransportError
fn map_http_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Http(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        TransportError::Http(format!("Connection error: {}", error))
    } else {
        TransportError::Http(format!("HTTP error: {}", error))
    }
}

fn build_collector_http_client() -> Result<Client, TransportError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(COLLECTOR_HTTP_CONNECT_TIMEOUT)
        .timeout(COLLECTOR_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))
}

pub struct HttpTransport {
    client: Client,
    endpoint: String,
    enabled: AtomicBool,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_collector_http_client()?,
            endpoint: endpoint.into(),
            enabled: AtomicBool::new(true),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Toggle availability, e.g. when the host reports it went offline.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn is_usable(&self) -> bool {
        self.enabled.load(Ordering::SeqCst) && !self.endpoint.is_empty()
    }

    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError> {
        let payload = CollectorPayload {
            events: batch.events(),
            time: now_millis(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Http(format!(
                "Collector responded with status {}: {}",
                status, error_text
            )));
        }

        debug!(endpoint = %self.endpoint, events = batch.len(), "Delivered batch to collector");
        Ok(())
    }
}
