//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::TrackerError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &TrackerError) -> String {
    match e {
        TrackerError::ConfigError(msg) => format!("Configuration error: {}", msg),
        other => other.to_string(),
    }
}
