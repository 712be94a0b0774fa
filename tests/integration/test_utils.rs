//! Shared test utilities for integration tests
//!
//! `RecordingTransport` stands in for a collector: it records every batch it
//! receives and can be told to fail or to become unusable.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use waypost::context::Context;
use waypost::error::TransportError;
use waypost::event::{EventBatch, EventContexts, TrackerEvent};
use waypost::transport::Transport;
use waypost::types::EventId;

pub struct RecordingTransport {
    name: String,
    usable: AtomicBool,
    calls: AtomicUsize,
    fail_next: AtomicUsize,
    always_fail: AtomicBool,
    failing_ids: Mutex<HashSet<EventId>>,
    batches: Mutex<Vec<Vec<TrackerEvent>>>,
}

impl RecordingTransport {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            usable: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
            always_fail: AtomicBool::new(false),
            failing_ids: Mutex::new(HashSet::new()),
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn set_usable(&self, usable: bool) {
        self.usable.store(usable, Ordering::SeqCst);
    }

    /// Fail the next `count` calls, then succeed again.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn set_always_fail(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }

    /// Fail every batch that contains `id`.
    pub fn fail_batches_containing(&self, id: EventId) {
        self.failing_ids.lock().insert(id);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successfully handled batches, in completion order.
    pub fn batches(&self) -> Vec<Vec<TrackerEvent>> {
        self.batches.lock().clone()
    }

    pub fn delivered_ids(&self) -> Vec<EventId> {
        self.batches
            .lock()
            .iter()
            .flatten()
            .map(|event| event.id())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.usable.load(Ordering::SeqCst)
    }

    async fn handle(&self, batch: &EventBatch) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.always_fail.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(format!("{} is down", self.name)));
        }
        let pending_failures = self.fail_next.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_next.store(pending_failures - 1, Ordering::SeqCst);
            return Err(TransportError::SendFailed(format!("{} flaked", self.name)));
        }
        {
            let failing = self.failing_ids.lock();
            if batch.ids().iter().any(|id| failing.contains(id)) {
                return Err(TransportError::SendFailed(format!(
                    "{} rejected batch",
                    self.name
                )));
            }
        }

        self.batches.lock().push(batch.events().to_vec());
        Ok(())
    }
}

pub fn press_event(button: &str) -> TrackerEvent {
    TrackerEvent::new(
        "PressEvent",
        EventContexts {
            location_stack: vec![
                Context::new("RootLocationContext", "home"),
                Context::new("ButtonContext", button),
            ],
            global_contexts: vec![Context::application("shop")],
        },
    )
}

pub fn press_events(count: usize) -> Vec<TrackerEvent> {
    (0..count).map(|i| press_event(&format!("button-{}", i))).collect()
}
