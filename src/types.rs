//! Shared identifiers and timestamps.

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier assigned to every resolved event
pub type EventId = Uuid;

/// Current time as milliseconds since Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a fresh event id.
pub fn new_event_id() -> EventId {
    Uuid::new_v4()
}
