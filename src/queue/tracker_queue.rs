//! Tracker Queue
//!
//! Drains a [`QueueStore`] into a [`Transport`] in batches. A runner task ticks
//! every `batch_delay_ms`; each tick claims at most one batch of up to
//! `batch_size` events that are not already in flight, and hands it to its own
//! delivery task. At most `concurrency` batches are in flight at once.
//!
//! Delivered batches are deleted from the store. Failed batches are released
//! but stay stored, so a later tick picks them up again. Backoff between
//! attempts belongs to the transport (see `TransportRetry`); the queue itself
//! only retries on its regular tick cadence.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::{StorageError, TransportError};
use crate::event::{EventBatch, TrackerEvent};
use crate::queue::QueueStore;
use crate::transport::Transport;
use crate::types::EventId;

/// Configuration for the tracker queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerQueueConfig {
    /// Maximum number of events per batch
    pub batch_size: usize,
    /// Delay between runner ticks (milliseconds)
    pub batch_delay_ms: u64,
    /// Maximum number of batches in flight
    pub concurrency: usize,
}

impl Default for TrackerQueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay_ms: 1000,
            concurrency: 4,
        }
    }
}

impl TrackerQueueConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.concurrency = self.concurrency.max(1);
        self
    }
}

/// Runner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Events waiting in the store, in flight included
    pub pending: usize,
    /// Events currently dispatched and awaiting confirmation
    pub in_flight: usize,
    /// Events confirmed delivered
    pub delivered: usize,
    /// Batches whose delivery failed
    pub failed_batches: usize,
}

/// Outcome of a [`TrackerQueue::flush`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub batches: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// A batch handed to its delivery task
pub struct DispatchedBatch {
    event_ids: Vec<EventId>,
    handle: JoinHandle<Result<(), TransportError>>,
}

impl DispatchedBatch {
    pub fn event_ids(&self) -> &[EventId] {
        &self.event_ids
    }

    /// Wait for the delivery task to settle.
    pub async fn wait(self) -> Result<(), TransportError> {
        self.handle
            .await
            .map_err(|e| TransportError::Queue(format!("Batch task failed: {}", e)))?
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: usize,
    failed_batches: usize,
}

struct QueueShared {
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn Transport>,
    config: TrackerQueueConfig,
    /// Ids of events dispatched but not yet settled
    processing_event_ids: Mutex<HashSet<EventId>>,
    /// Notified whenever the in-flight set drains to empty
    settled: Notify,
    permits: Arc<Semaphore>,
    state: RwLock<RunnerState>,
    /// Set by `stop_runner`; keeps `push` from restarting the runner
    stopped: RwLock<bool>,
    runner: Mutex<Option<JoinHandle<()>>>,
    counters: RwLock<Counters>,
}

impl QueueShared {
    /// Claim the next batch: up to `batch_size` stored events, in order,
    /// skipping in-flight ids and any id in `exclude`.
    fn claim_batch(&self, exclude: Option<&HashSet<EventId>>) -> Option<EventBatch> {
        let mut processing = self.processing_event_ids.lock();
        let read = {
            let in_flight = &*processing;
            let filter = |event: &TrackerEvent| {
                let id = event.id();
                !in_flight.contains(&id) && exclude.map_or(true, |ex| !ex.contains(&id))
            };
            self.store.read(Some(self.config.batch_size), Some(&filter))
        };

        let events = match read {
            Ok(events) => events,
            Err(err) => {
                error!(error = %err, "Failed to read queued events");
                return None;
            }
        };
        let batch = EventBatch::new(events)?;
        processing.extend(batch.ids());
        Some(batch)
    }

    fn spawn_delivery(self: &Arc<Self>, batch: EventBatch, permit: OwnedSemaphorePermit) -> DispatchedBatch {
        let event_ids = batch.ids();
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = shared.deliver(batch).await;
            drop(permit);
            result
        });
        DispatchedBatch { event_ids, handle }
    }

    async fn deliver(&self, batch: EventBatch) -> Result<(), TransportError> {
        let ids = batch.ids();
        debug!(
            transport = %self.transport.name(),
            events = ids.len(),
            "Dispatching batch"
        );

        let result = match AssertUnwindSafe(self.transport.handle(&batch))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::SendFailed(
                "transport panicked while handling batch".to_string(),
            )),
        };

        match &result {
            Ok(()) => {
                if let Err(err) = self.store.delete(&ids) {
                    error!(
                        error = %err,
                        events = ids.len(),
                        "Delivered batch could not be removed from the store"
                    );
                }
                self.counters.write().delivered += ids.len();
            }
            Err(err) => {
                self.counters.write().failed_batches += 1;
                warn!(
                    transport = %self.transport.name(),
                    events = ids.len(),
                    error = %err,
                    "Batch delivery failed, events kept for a later run"
                );
            }
        }

        let drained = {
            let mut processing = self.processing_event_ids.lock();
            for id in &ids {
                processing.remove(id);
            }
            processing.is_empty()
        };
        if drained {
            self.settled.notify_waiters();
        }
        result
    }

    /// Wait until no batch is in flight.
    async fn wait_settled(&self) {
        loop {
            let notified = self.settled.notified();
            if self.processing_event_ids.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn dispatch_next(self: &Arc<Self>) -> Option<DispatchedBatch> {
        if !self.transport.is_usable() {
            debug!(transport = %self.transport.name(), "Transport not usable, skipping tick");
            return None;
        }
        let permit = Arc::clone(&self.permits).try_acquire_owned().ok()?;
        let batch = self.claim_batch(None)?;
        Some(self.spawn_delivery(batch, permit))
    }

    async fn run(shared: Arc<QueueShared>) {
        debug!(
            batch_size = shared.config.batch_size,
            batch_delay_ms = shared.config.batch_delay_ms,
            concurrency = shared.config.concurrency,
            "Queue runner started"
        );
        loop {
            let _ = shared.dispatch_next();
            sleep(shared.config.batch_delay()).await;
        }
    }
}

/// Batching delivery queue over a [`QueueStore`]
pub struct TrackerQueue {
    shared: Arc<QueueShared>,
}

impl TrackerQueue {
    pub fn new(
        store: Arc<dyn QueueStore>,
        transport: Arc<dyn Transport>,
        config: TrackerQueueConfig,
    ) -> Self {
        let config = config.normalized();
        Self {
            shared: Arc::new(QueueShared {
                store,
                transport,
                permits: Arc::new(Semaphore::new(config.concurrency)),
                config,
                processing_event_ids: Mutex::new(HashSet::new()),
                settled: Notify::new(),
                state: RwLock::new(RunnerState::Idle),
                stopped: RwLock::new(false),
                runner: Mutex::new(None),
                counters: RwLock::new(Counters::default()),
            }),
        }
    }

    pub fn config(&self) -> &TrackerQueueConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.shared.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.shared.transport
    }

    pub fn state(&self) -> RunnerState {
        *self.shared.state.read()
    }

    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.is_empty()
    }

    pub fn processing_event_ids(&self) -> Vec<EventId> {
        self.shared
            .processing_event_ids
            .lock()
            .iter()
            .copied()
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        let counters = self.shared.counters.read();
        QueueStats {
            pending: self.shared.store.len(),
            in_flight: self.shared.processing_event_ids.lock().len(),
            delivered: counters.delivered,
            failed_batches: counters.failed_batches,
        }
    }

    /// Store one event and start the runner if it is idle.
    pub fn push(&self, event: TrackerEvent) -> Result<(), StorageError> {
        self.push_batch(std::slice::from_ref(&event))
    }

    /// Store events in order and start the runner if it is idle.
    ///
    /// The runner is not restarted after an explicit [`stop_runner`](Self::stop_runner).
    pub fn push_batch(&self, events: &[TrackerEvent]) -> Result<(), StorageError> {
        self.shared.store.write(events)?;
        debug!(
            events = events.len(),
            pending = self.shared.store.len(),
            "Queued events"
        );

        if !*self.shared.stopped.read() && self.state() == RunnerState::Idle {
            self.start_runner();
        }
        Ok(())
    }

    /// Start the runner task.
    ///
    /// Outside a tokio runtime nothing is spawned; the runner stays idle and
    /// a later call from within a runtime starts it.
    pub fn start_runner(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, queued events wait for an explicit start");
            return;
        };
        *self.shared.stopped.write() = false;
        {
            let mut state = self.shared.state.write();
            if *state == RunnerState::Running {
                return;
            }
            *state = RunnerState::Running;
        }

        let shared = Arc::clone(&self.shared);
        let handle = runtime.spawn(QueueShared::run(shared));
        if let Some(previous) = self.shared.runner.lock().replace(handle) {
            previous.abort();
        }
        info!("Started tracker queue runner");
    }

    /// Stop scheduling new batches. Batches already dispatched run to completion.
    pub fn stop_runner(&self) {
        *self.shared.stopped.write() = true;
        {
            let mut state = self.shared.state.write();
            if *state == RunnerState::Idle {
                return;
            }
            *state = RunnerState::Idle;
        }
        if let Some(handle) = self.shared.runner.lock().take() {
            handle.abort();
        }
        info!("Stopped tracker queue runner");
    }

    /// Run one scheduling step: dispatch the next batch if a concurrency slot
    /// is free, the transport is usable, and unclaimed events are stored.
    pub fn dispatch_next_batch(&self) -> Option<DispatchedBatch> {
        self.shared.dispatch_next()
    }

    /// Dispatch everything stored right away, without waiting for ticks, and
    /// wait until every in-flight batch has settled.
    ///
    /// Each event is attempted at most once per flush. Batches the runner
    /// dispatched earlier are not counted in the report, but flush still
    /// waits for them.
    pub async fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();
        if !self.shared.transport.is_usable() {
            warn!(transport = %self.shared.transport.name(), "Transport not usable, nothing flushed");
            return report;
        }

        let mut attempted = HashSet::new();
        let mut dispatched = Vec::new();
        loop {
            let permit = match Arc::clone(&self.shared.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let Some(batch) = self.shared.claim_batch(Some(&attempted)) else {
                break;
            };
            attempted.extend(batch.ids());
            dispatched.push(self.shared.spawn_delivery(batch, permit));
        }

        for batch in dispatched {
            let events = batch.event_ids().len();
            report.batches += 1;
            match batch.wait().await {
                Ok(()) => report.delivered += events,
                Err(_) => report.failed += events,
            }
        }
        self.shared.wait_settled().await;

        info!(
            batches = report.batches,
            delivered = report.delivered,
            failed = report.failed,
            "Flushed tracker queue"
        );
        report
    }
}

impl Drop for TrackerQueue {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.runner.lock().take() {
            handle.abort();
        }
    }
}
