//! Event queue: ordered pending-event stores and the batching delivery queue.
//!
//! A [`QueueStore`] keeps resolved events in enqueue order until delivery is
//! confirmed. [`TrackerQueue`] drains a store into a transport in bounded
//! batches, with a bounded number of batches in flight.

pub mod memory;
pub mod persistent;
pub mod tracker_queue;

pub use memory::MemoryQueueStore;
pub use persistent::PersistentQueueStore;
pub use tracker_queue::{
    DispatchedBatch, FlushReport, QueueStats, RunnerState, TrackerQueue, TrackerQueueConfig,
};

use crate::error::StorageError;
use crate::event::TrackerEvent;
use crate::types::EventId;

/// Predicate applied to stored events on read
pub type EventFilter<'a> = &'a dyn Fn(&TrackerEvent) -> bool;

/// Insertion-ordered storage of pending events.
///
/// Implementations synchronize internally so a store can be shared between
/// the queue runner and its in-flight batch tasks.
pub trait QueueStore: Send + Sync {
    /// Append events, keeping their order.
    fn write(&self, events: &[TrackerEvent]) -> Result<(), StorageError>;

    /// Read up to `limit` events matching `filter`, in insertion order.
    fn read(
        &self,
        limit: Option<usize>,
        filter: Option<EventFilter<'_>>,
    ) -> Result<Vec<TrackerEvent>, StorageError>;

    /// Remove the given events; unknown ids are ignored.
    fn delete(&self, event_ids: &[EventId]) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared read semantics for list-backed stores.
pub(crate) fn select_events(
    events: &[TrackerEvent],
    limit: Option<usize>,
    filter: Option<EventFilter<'_>>,
) -> Vec<TrackerEvent> {
    let limit = limit.unwrap_or(usize::MAX);
    events
        .iter()
        .filter(|event| filter.map_or(true, |f| f(event)))
        .take(limit)
        .cloned()
        .collect()
}
