//! Configuration System
//!
//! Layered configuration for the tracker pipeline. Sources are merged in
//! increasing priority: merge-policy defaults, the user config file, an explicit
//! config file, then `WAYPOST_*` environment variables (`__` separates nested
//! keys, e.g. `WAYPOST_QUEUE__BATCH_SIZE=50`).

use crate::logging::LoggingConfig;
use crate::queue::TrackerQueueConfig;
use crate::transport::RetryPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WaypostConfig {
    #[serde(default)]
    pub tracker: TrackerSettings,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracker identity and collector endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Tracker id; also names the persistent queue slot
    #[serde(default = "default_tracker_id")]
    pub tracker_id: String,

    /// Id carried by the `ApplicationContext` global context
    #[serde(default = "default_application_id")]
    pub application_id: String,

    /// Collector endpoint; without one, events only reach the debug sink
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Upper bound for each deferred context (milliseconds)
    #[serde(default = "default_promise_timeout_ms")]
    pub promise_timeout_ms: u64,
}

fn default_tracker_id() -> String {
    "waypost".to_string()
}

fn default_application_id() -> String {
    "waypost-app".to_string()
}

fn default_promise_timeout_ms() -> u64 {
    5000
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            tracker_id: default_tracker_id(),
            application_id: default_application_id(),
            endpoint: None,
            promise_timeout_ms: default_promise_timeout_ms(),
        }
    }
}

impl TrackerSettings {
    pub fn promise_timeout(&self) -> Duration {
        Duration::from_millis(self.promise_timeout_ms)
    }
}

/// Where pending events are kept
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Persistent,
}

/// Queue batching and storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub store: StoreKind,

    /// sled database directory; defaults to the platform data directory
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    4
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            concurrency: default_concurrency(),
            store: StoreKind::default(),
            store_path: None,
        }
    }
}

impl QueueSettings {
    pub fn queue_config(&self) -> TrackerQueueConfig {
        TrackerQueueConfig {
            batch_size: self.batch_size,
            batch_delay_ms: self.batch_delay_ms,
            concurrency: self.concurrency,
        }
    }

    /// Configured store path, or `<data dir>/queue` for the platform.
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        self.store_path.clone().or_else(default_store_path)
    }
}

/// Default sled location, e.g. `~/.local/share/waypost/queue` on Linux.
pub fn default_store_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "waypost").map(|dirs| dirs.data_dir().join("queue"))
}

/// Backoff for collector delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,

    #[serde(default)]
    pub max_timeout_ms: Option<u64>,

    #[serde(default)]
    pub max_retry_ms: Option<u64>,

    #[serde(default = "default_retry_factor")]
    pub retry_factor: f64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_min_timeout_ms() -> u64 {
    1000
}

fn default_retry_factor() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_timeout_ms: default_min_timeout_ms(),
            max_timeout_ms: None,
            max_retry_ms: None,
            retry_factor: default_retry_factor(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_timeout: Duration::from_millis(self.min_timeout_ms),
            max_timeout: self.max_timeout_ms.map(Duration::from_millis),
            max_retry: self.max_retry_ms.map(Duration::from_millis),
            retry_factor: self.retry_factor,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Tracker(String),
    Queue(String),
    Retry(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Tracker(msg) => write!(f, "Tracker: {}", msg),
            ValidationError::Queue(msg) => write!(f, "Queue: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl WaypostConfig {
    /// Validate the entire configuration, reporting every violation.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.tracker.tracker_id.trim().is_empty() {
            errors.push(ValidationError::Tracker(
                "tracker_id cannot be empty".to_string(),
            ));
        }
        if self.tracker.application_id.trim().is_empty() {
            errors.push(ValidationError::Tracker(
                "application_id cannot be empty".to_string(),
            ));
        }
        if let Some(endpoint) = &self.tracker.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ValidationError::Tracker(format!(
                    "endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        if self.queue.batch_size == 0 {
            errors.push(ValidationError::Queue("batch_size must be at least 1".to_string()));
        }
        if self.queue.concurrency == 0 {
            errors.push(ValidationError::Queue("concurrency must be at least 1".to_string()));
        }
        if self.queue.store == StoreKind::Persistent && self.queue.resolved_store_path().is_none() {
            errors.push(ValidationError::Queue(
                "persistent store requires store_path (no platform data directory found)"
                    .to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::Retry("max_attempts must be at least 1".to_string()));
        }
        if !self.retry.retry_factor.is_finite() || self.retry.retry_factor < 1.0 {
            errors.push(ValidationError::Retry(format!(
                "retry_factor must be >= 1.0, got {}",
                self.retry.retry_factor
            )));
        }
        if let Some(max) = self.retry.max_timeout_ms {
            if max < self.retry.min_timeout_ms {
                errors.push(ValidationError::Retry(format!(
                    "max_timeout_ms ({}) is below min_timeout_ms ({})",
                    max, self.retry.min_timeout_ms
                )));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
