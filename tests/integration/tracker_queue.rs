//! Integration tests for the tracker queue
//!
//! Tests cover:
//! - Batch claiming in insertion order
//! - In-flight exclusion and the concurrency limit
//! - Failed batches staying in the store
//! - Runner ticks, stop/start
//! - Flush

use std::sync::Arc;
use std::time::Duration;

use waypost::queue::{
    FlushReport, MemoryQueueStore, QueueStore, RunnerState, TrackerQueue, TrackerQueueConfig,
};
use waypost::types::EventId;

use super::test_utils::{press_events, RecordingTransport};

fn config(batch_size: usize, concurrency: usize) -> TrackerQueueConfig {
    TrackerQueueConfig {
        batch_size,
        batch_delay_ms: 1000,
        concurrency,
    }
}

fn create_test_queue(
    config: TrackerQueueConfig,
) -> (TrackerQueue, Arc<MemoryQueueStore>, Arc<RecordingTransport>) {
    let store = Arc::new(MemoryQueueStore::new());
    let transport = RecordingTransport::new("collector");
    let queue = TrackerQueue::new(store.clone(), transport.clone(), config);
    (queue, store, transport)
}

#[tokio::test]
async fn test_failed_batch_stays_in_store() {
    let (queue, store, transport) = create_test_queue(config(2, 2));
    let events = press_events(3);
    let ids: Vec<EventId> = events.iter().map(|e| e.id()).collect();
    transport.fail_batches_containing(ids[0]);
    store.write(&events).unwrap();

    let first = queue.dispatch_next_batch().unwrap();
    let second = queue.dispatch_next_batch().unwrap();
    assert_eq!(first.event_ids(), &ids[..2]);
    assert_eq!(second.event_ids(), &ids[2..]);

    let mut in_flight = queue.processing_event_ids();
    in_flight.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(in_flight, expected);

    assert!(first.wait().await.is_err());
    assert!(second.wait().await.is_ok());

    let remaining: Vec<EventId> = store.read(None, None).unwrap().iter().map(|e| e.id()).collect();
    assert_eq!(remaining, ids[..2].to_vec());
    assert!(queue.processing_event_ids().is_empty());

    let stats = queue.stats();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(transport.delivered_ids(), vec![ids[2]]);
}

#[tokio::test]
async fn test_concurrency_limit_bounds_in_flight_batches() {
    let (queue, store, _transport) = create_test_queue(config(1, 1));
    store.write(&press_events(3)).unwrap();

    let first = queue.dispatch_next_batch().unwrap();
    assert!(queue.dispatch_next_batch().is_none());
    assert_eq!(queue.stats().in_flight, 1);

    first.wait().await.unwrap();
    let second = queue.dispatch_next_batch().unwrap();
    second.wait().await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_in_flight_events_are_never_reclaimed() {
    let (queue, store, _transport) = create_test_queue(config(10, 4));
    store.write(&press_events(2)).unwrap();

    let first = queue.dispatch_next_batch().unwrap();
    assert_eq!(first.event_ids().len(), 2);
    assert!(queue.dispatch_next_batch().is_none());

    store.write(&press_events(1)).unwrap();
    let second = queue.dispatch_next_batch().unwrap();
    assert_eq!(second.event_ids().len(), 1);
    assert!(first
        .event_ids()
        .iter()
        .all(|id| !second.event_ids().contains(id)));

    first.wait().await.unwrap();
    second.wait().await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unusable_transport_skips_dispatch() {
    let (queue, store, transport) = create_test_queue(config(10, 4));
    store.write(&press_events(2)).unwrap();
    transport.set_usable(false);

    assert!(queue.dispatch_next_batch().is_none());
    assert_eq!(queue.flush().await, FlushReport::default());
    assert_eq!(store.len(), 2);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_flush_drains_in_batches() {
    let (queue, store, transport) = create_test_queue(config(10, 2));
    store.write(&press_events(25)).unwrap();

    let report = queue.flush().await;
    assert_eq!(
        report,
        FlushReport {
            batches: 3,
            delivered: 25,
            failed: 0
        }
    );
    assert!(store.is_empty());

    let mut sizes: Vec<usize> = transport.batches().iter().map(Vec::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5, 10, 10]);
}

#[tokio::test]
async fn test_flush_attempts_each_event_once() {
    let (queue, store, transport) = create_test_queue(config(2, 1));
    store.write(&press_events(4)).unwrap();
    transport.set_always_fail(true);

    let report = queue.flush().await;
    assert_eq!(report.batches, 2);
    assert_eq!(report.failed, 4);
    assert_eq!(transport.calls(), 2);
    assert_eq!(store.len(), 4);

    transport.set_always_fail(false);
    let report = queue.flush().await;
    assert_eq!(report.delivered, 4);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_within_batch_order_preserved() {
    let (queue, _store, transport) = create_test_queue(config(5, 1));
    queue.stop_runner();
    let events = press_events(5);
    for event in &events {
        queue.push(event.clone()).unwrap();
    }
    queue.flush().await;

    let expected: Vec<EventId> = events.iter().map(|e| e.id()).collect();
    assert_eq!(transport.delivered_ids(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_runner_drains_one_batch_per_tick() {
    let (queue, _store, transport) = create_test_queue(config(2, 1));
    for event in press_events(5) {
        queue.push(event).unwrap();
    }
    assert_eq!(queue.state(), RunnerState::Running);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(transport.batches().len(), 1);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(transport.batches().len(), 3);
    assert!(queue.is_empty());
    queue.stop_runner();
}

#[tokio::test(start_paused = true)]
async fn test_stopped_runner_leaves_events_queued() {
    let (queue, _store, transport) = create_test_queue(config(10, 1));
    queue.stop_runner();
    for event in press_events(3) {
        queue.push(event).unwrap();
    }
    assert_eq!(queue.state(), RunnerState::Idle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.calls(), 0);
    assert_eq!(queue.len(), 3);

    queue.start_runner();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(queue.is_empty());
    queue.stop_runner();
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_retried_on_later_tick() {
    let (queue, _store, transport) = create_test_queue(config(10, 1));
    transport.fail_next(1);
    for event in press_events(2) {
        queue.push(event).unwrap();
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.stats().failed_batches, 1);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(queue.is_empty());
    assert_eq!(transport.calls(), 2);
    queue.stop_runner();
}
