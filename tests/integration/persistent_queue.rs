//! Integration tests for the sled-backed queue store

use std::sync::Arc;

use tempfile::TempDir;
use waypost::queue::{
    PersistentQueueStore, QueueStore, TrackerQueue, TrackerQueueConfig,
};
use waypost::types::EventId;

use super::test_utils::{press_events, RecordingTransport};

fn ids(store: &dyn QueueStore) -> Vec<EventId> {
    store
        .read(None, None)
        .unwrap()
        .iter()
        .map(|event| event.id())
        .collect()
}

#[test]
fn test_queue_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("queue");
    let events = press_events(3);
    let expected: Vec<EventId> = events.iter().map(|e| e.id()).collect();

    {
        let store = PersistentQueueStore::open(&path, "shop").unwrap();
        store.write(&events).unwrap();
    }

    {
        let store = PersistentQueueStore::open(&path, "shop").unwrap();
        assert_eq!(ids(&store), expected);
        assert_eq!(store.read(None, None).unwrap(), events);
        store.delete(&expected[..1]).unwrap();
    }

    let store = PersistentQueueStore::open(&path, "shop").unwrap();
    assert_eq!(ids(&store), expected[1..].to_vec());
}

#[test]
fn test_slots_are_scoped_per_tracker() {
    let temp_dir = TempDir::new().unwrap();
    let db = sled::open(temp_dir.path().join("queue")).unwrap();

    let shop = PersistentQueueStore::new(db.clone(), "shop").unwrap();
    let admin = PersistentQueueStore::new(db.clone(), "admin").unwrap();
    shop.write(&press_events(2)).unwrap();

    assert_eq!(shop.len(), 2);
    assert!(admin.is_empty());
    assert_eq!(shop.slot(), "waypost-queue-shop");

    let reloaded = PersistentQueueStore::new(db, "shop").unwrap();
    assert_eq!(reloaded.len(), 2);
}

#[test]
fn test_read_filter_and_limit_follow_insertion_order() {
    let temp_dir = TempDir::new().unwrap();
    let store = PersistentQueueStore::open(temp_dir.path().join("queue"), "shop").unwrap();
    let events = press_events(5);
    store.write(&events).unwrap();

    let skip = events[1].id();
    let filter = |event: &waypost::event::TrackerEvent| event.id() != skip;
    let read = store.read(Some(2), Some(&filter)).unwrap();
    assert_eq!(
        read.iter().map(|e| e.id()).collect::<Vec<_>>(),
        vec![events[0].id(), events[2].id()]
    );
}

#[tokio::test]
async fn test_restarted_queue_delivers_leftovers() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("queue");
    let events = press_events(4);

    {
        let store = PersistentQueueStore::open(&path, "shop").unwrap();
        store.write(&events).unwrap();
    }

    let store: Arc<dyn QueueStore> = Arc::new(PersistentQueueStore::open(&path, "shop").unwrap());
    let collector = RecordingTransport::new("collector");
    let queue = TrackerQueue::new(
        Arc::clone(&store),
        collector.clone(),
        TrackerQueueConfig {
            batch_size: 10,
            batch_delay_ms: 1000,
            concurrency: 1,
        },
    );

    let report = queue.flush().await;
    assert_eq!(report.delivered, 4);
    assert_eq!(
        collector.delivered_ids(),
        events.iter().map(|e| e.id()).collect::<Vec<_>>()
    );
    assert!(store.is_empty());

    drop(queue);
    drop(store);
    let reopened = PersistentQueueStore::open(&path, "shop").unwrap();
    assert!(reopened.is_empty());
}
