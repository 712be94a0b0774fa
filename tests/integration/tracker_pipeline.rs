//! End-to-end tests: tracker, resolution, queue, and delivery

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use waypost::config::TrackerSettings;
use waypost::context::{Context, ResolvableContext, TIMEOUT_MESSAGE};
use waypost::event::{EventContexts, EventDraft};
use waypost::queue::{MemoryQueueStore, TrackerQueue, TrackerQueueConfig};
use waypost::tracker::{Tracker, TrackerPlugin};
use waypost::transport::{DebugTransport, QueuedTransport, Transport, TransportGroup};

use super::test_utils::RecordingTransport;

struct PathContextPlugin;

impl TrackerPlugin for PathContextPlugin {
    fn name(&self) -> &str {
        "path-context"
    }

    fn enrich(&self, contexts: &mut EventContexts) {
        contexts
            .global_contexts
            .push(Context::new("PathContext", "/checkout"));
    }
}

fn settings(timeout_ms: u64) -> TrackerSettings {
    TrackerSettings {
        tracker_id: "pipeline".to_string(),
        application_id: "shop".to_string(),
        endpoint: None,
        promise_timeout_ms: timeout_ms,
    }
}

fn queued_tracker(
    timeout_ms: u64,
) -> (Tracker, Arc<TrackerQueue>, Arc<RecordingTransport>) {
    let collector = RecordingTransport::new("collector");
    let queue = Arc::new(TrackerQueue::new(
        Arc::new(MemoryQueueStore::new()),
        collector.clone(),
        TrackerQueueConfig::default(),
    ));
    queue.stop_runner();
    let transport: Arc<dyn Transport> = Arc::new(QueuedTransport::new(Arc::clone(&queue)));
    (Tracker::new(&settings(timeout_ms), transport), queue, collector)
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_contexts_become_error_contexts_in_place() {
    let (tracker, queue, collector) = queued_tracker(200);

    let draft = EventDraft::new("PressEvent")
        .with_location(Context::new("RootLocationContext", "home"))
        .with_location(ResolvableContext::deferred(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Context::new("SectionContext", "never"))
        }))
        .with_location(Context::new("ButtonContext", "buy"))
        .with_global_context(ResolvableContext::deferred(async {
            Err(anyhow!("user lookup failed"))
        }))
        .with_global_context(ResolvableContext::factory(|| {
            Ok(Context::new("UserContext", "u1"))
        }));

    let event = tracker.track_event(draft).await.unwrap().unwrap();
    assert_eq!(queue.len(), 1);

    let location: Vec<&str> = event.location_stack().iter().map(|c| c.type_name()).collect();
    assert_eq!(
        location,
        vec!["RootLocationContext", "ErrorContext", "ButtonContext"]
    );
    assert_eq!(event.location_stack()[1].error_message(), Some(TIMEOUT_MESSAGE));
    assert_eq!(
        event.global_contexts()[0].error_message(),
        Some("user lookup failed")
    );
    assert_eq!(event.global_contexts()[1].id(), "u1");
    assert_eq!(event.error_contexts().count(), 2);

    queue.flush().await;
    let delivered = collector.batches();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0][0], event);
}

#[tokio::test]
async fn test_plugins_run_in_order_after_tracker_contexts() {
    let (tracker, queue, _collector) = queued_tracker(1000);
    let tracker = tracker
        .with_global_context(Context::new("DeviceContext", "desktop"))
        .with_plugin(Box::new(PathContextPlugin));
    assert_eq!(
        tracker.plugin_names(),
        vec!["application-context", "path-context"]
    );

    let event = tracker
        .track_event(EventDraft::new("VisibleEvent").with_global_context(Context::application("shop")))
        .await
        .unwrap()
        .unwrap();

    let globals: Vec<String> = event.global_contexts().iter().map(|c| c.path_segment()).collect();
    assert_eq!(
        globals,
        vec![
            "DeviceContext:desktop",
            "ApplicationContext:shop",
            "PathContext:/checkout"
        ]
    );
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_inactive_tracker_enqueues_nothing() {
    let (tracker, queue, _collector) = queued_tracker(1000);
    tracker.set_active(false);
    assert!(tracker
        .track_event(EventDraft::new("PressEvent"))
        .await
        .unwrap()
        .is_none());
    tracker.set_active(true);
    tracker.track_event(EventDraft::new("PressEvent")).await.unwrap();
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_serialized_event_shape() {
    let (tracker, _queue, _collector) = queued_tracker(1000);
    let event = tracker
        .track_event(
            EventDraft::new("PressEvent")
                .with_location(Context::new("ButtonContext", "buy").with_attribute("text", "Buy")),
        )
        .await
        .unwrap()
        .unwrap();

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["_type"], "PressEvent");
    assert_eq!(value["id"], event.id().to_string());
    assert_eq!(value["location_stack"][0]["_type"], "ButtonContext");
    assert_eq!(value["location_stack"][0]["text"], "Buy");
    assert_eq!(value["global_contexts"][0]["_type"], "ApplicationContext");
}

#[tokio::test]
async fn test_offline_collector_still_queues_events() {
    let collector = RecordingTransport::new("collector");
    collector.set_usable(false);
    let queue = Arc::new(TrackerQueue::new(
        Arc::new(MemoryQueueStore::new()),
        collector.clone(),
        TrackerQueueConfig::default(),
    ));
    let queued: Arc<dyn Transport> = Arc::new(QueuedTransport::new(Arc::clone(&queue)));
    let debug: Arc<dyn Transport> = Arc::new(DebugTransport::new());
    let tracker = Tracker::new(&settings(1000), Arc::new(TransportGroup::new(vec![queued, debug])));

    tracker.track_event(EventDraft::new("PressEvent")).await.unwrap().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(collector.calls(), 0);

    collector.set_usable(true);
    let report = queue.flush().await;
    assert_eq!(report.delivered, 1);
    assert!(queue.is_empty());
    queue.stop_runner();
}
