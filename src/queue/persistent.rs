//! Durable sled-backed queue store.
//!
//! Each tracker owns one named slot holding the whole pending list as a JSON
//! array. The slot is rewritten on every mutation and loaded eagerly on open,
//! so a queue resumes where it left off after a restart.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use parking_lot::Mutex;
use sled::{Db, Tree};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::event::TrackerEvent;
use crate::queue::{select_events, EventFilter, QueueStore};
use crate::types::EventId;

const TREE_QUEUE: &str = "waypost_queue";
const SLOT_PREFIX: &str = "waypost-queue-";

pub struct PersistentQueueStore {
    db: Db,
    tree: Tree,
    slot: String,
    events: Mutex<Vec<TrackerEvent>>,
}

impl PersistentQueueStore {
    /// Open (or create) the database at `path` and load the tracker's slot.
    pub fn open<P: AsRef<Path>>(path: P, tracker_id: &str) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(to_storage_io)?;
        Self::new(db, tracker_id)
    }

    pub fn new(db: Db, tracker_id: &str) -> Result<Self, StorageError> {
        if tracker_id.trim().is_empty() {
            return Err(StorageError::InvalidSlot(
                "tracker id cannot be empty".to_string(),
            ));
        }
        let tree = db.open_tree(TREE_QUEUE).map_err(to_storage_io)?;
        let slot = slot_name(tracker_id);
        let events = load_slot(&tree, &slot);
        debug!(slot = %slot, pending = events.len(), "Loaded persistent queue");
        Ok(Self {
            db,
            tree,
            slot,
            events: Mutex::new(events),
        })
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Name of the slot a tracker id maps to.
    pub fn slot_name(tracker_id: &str) -> String {
        slot_name(tracker_id)
    }

    fn persist(&self, events: &[TrackerEvent]) -> Result<(), StorageError> {
        let value = serde_json::to_vec(events).map_err(to_storage_data)?;
        self.tree
            .insert(self.slot.as_bytes(), value)
            .map_err(to_storage_io)?;
        self.tree.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

impl QueueStore for PersistentQueueStore {
    fn write(&self, events: &[TrackerEvent]) -> Result<(), StorageError> {
        let mut guard = self.events.lock();
        let mut next = guard.clone();
        next.extend_from_slice(events);
        self.persist(&next)?;
        *guard = next;
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
        let mut guard = self.events.lock();
        let next: Vec<TrackerEvent> = guard
            .iter()
            .filter(|event| !ids.contains(&event.id()))
            .cloned()
            .collect();
        if next.len() == guard.len() {
            return Ok(());
        }
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.events.lock();
        self.tree
            .remove(self.slot.as_bytes())
            .map_err(to_storage_io)?;
        self.tree.flush().map_err(to_storage_io)?;
        guard.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.events.lock().len()
    }
}

fn slot_name(tracker_id: &str) -> String {
    format!("{SLOT_PREFIX}{tracker_id}")
}

/// Unreadable or corrupt slot content is treated as an empty queue.
fn load_slot(tree: &Tree, slot: &str) -> Vec<TrackerEvent> {
    let raw = match tree.get(slot.as_bytes()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(slot = %slot, error = %err, "Failed to read persisted queue, starting empty");
            return Vec::new();
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(events) => events,
        Err(err) => {
            warn!(slot = %slot, error = %err, "Persisted queue is corrupt, starting empty");
            Vec::new()
        }
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
