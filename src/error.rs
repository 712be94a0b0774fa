//! Error types for the Waypost event tracking pipeline.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid queue slot: {0}")]
    InvalidSlot(String),
}

/// Location tree contract violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocationTreeError {
    #[error("Parent location {parent} not found while adding {child}")]
    ParentNotFound { parent: String, child: String },
}

/// Delivery errors reported by transports
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("No usable transport available")]
    NotUsable,

    #[error("Transport send failed: {0}")]
    SendFailed(String),

    #[error("HTTP delivery failed: {0}")]
    Http(String),

    #[error("Retry budget exhausted after {attempts} attempt(s): {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    #[error("{failed} of {total} grouped transport(s) failed: {}", errors.join("; "))]
    GroupFailed {
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },

    #[error("Queue error: {0}")]
    Queue(String),
}

impl From<StorageError> for TransportError {
    fn from(err: StorageError) -> Self {
        TransportError::Queue(err.to_string())
    }
}

/// Tracker-level errors
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for TrackerError {
    fn from(err: config::ConfigError) -> Self {
        TrackerError::ConfigError(err.to_string())
    }
}
