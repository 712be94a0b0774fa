//! In-memory queue store

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::event::TrackerEvent;
use crate::queue::{select_events, EventFilter, QueueStore};
use crate::types::EventId;

/// Ephemeral store; contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    events: Mutex<Vec<TrackerEvent>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for MemoryQueueStore {
    fn write(&self, events: &[TrackerEvent]) -> Result<(), StorageError> {
        self.events.lock().extend_from_slice(events);
        Ok(())
    }

    fn read(
        &self,
        limit: Option<usize>,
        filter: Option<EventFilter<'_>>,
    ) -> Result<Vec<TrackerEvent>, StorageError> {
        Ok(select_events(&self.events.lock(), limit, filter))
    }

    fn delete(&self, event_ids: &[EventId]) -> Result<(), StorageError> {
        let ids: HashSet<EventId> = event_ids.iter().copied().collect();
        self.events.lock().retain(|event| !ids.contains(&event.id()));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.events.lock().clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.events.lock().len()
    }
}
