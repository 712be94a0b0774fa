//! Tracker
//!
//! Ties context resolution, plugins, and the transport pipeline together.
//! `track_event` resolves a draft into a [`TrackerEvent`] and hands it to the
//! transport; with a queued pipeline that means the event is stored, not yet
//! delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{StoreKind, TrackerSettings, WaypostConfig};
use crate::context::{Context, ContextResolver};
use crate::error::{StorageError, TrackerError, TransportError};
use crate::event::{EventBatch, EventContexts, EventDraft, TrackerEvent};
use crate::queue::{MemoryQueueStore, PersistentQueueStore, QueueStore, TrackerQueue};
use crate::transport::{
    DebugTransport, HttpTransport, QueuedTransport, Transport, TransportGroup, TransportRetry,
    TransportSwitch,
};

/// Hook that may amend an event's resolved contexts before it is assembled.
pub trait TrackerPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn enrich(&self, contexts: &mut EventContexts);
}

/// Adds an `ApplicationContext` global context unless one with the same id is
/// already present.
pub struct ApplicationContextPlugin {
    context: Context,
}

impl ApplicationContextPlugin {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            context: Context::application(application_id),
        }
    }
}

impl TrackerPlugin for ApplicationContextPlugin {
    fn name(&self) -> &str {
        "application-context"
    }

    fn enrich(&self, contexts: &mut EventContexts) {
        if !contexts
            .global_contexts
            .iter()
            .any(|c| c.same_identity(&self.context))
        {
            contexts.global_contexts.push(self.context.clone());
        }
    }
}

/// Transport chain assembled from configuration
pub struct Pipeline {
    /// What the tracker hands events to
    pub transport: Arc<dyn Transport>,
    /// Delivery queue, present when a collector endpoint is configured
    pub queue: Option<Arc<TrackerQueue>>,
}

/// Open the configured queue store.
pub fn open_store(config: &WaypostConfig) -> Result<Arc<dyn QueueStore>, StorageError> {
    match config.queue.store {
        StoreKind::Memory => Ok(Arc::new(MemoryQueueStore::new())),
        StoreKind::Persistent => {
            let path = config.queue.resolved_store_path().ok_or_else(|| {
                StorageError::InvalidSlot("no store path configured".to_string())
            })?;
            Ok(Arc::new(PersistentQueueStore::open(
                path,
                &config.tracker.tracker_id,
            )?))
        }
    }
}

/// Collector delivery chain `Retry(Switch[Http])`; `None` without an endpoint.
pub fn build_delivery_transport(
    config: &WaypostConfig,
) -> Result<Option<Arc<dyn Transport>>, TrackerError> {
    let Some(endpoint) = config.tracker.endpoint.as_deref() else {
        return Ok(None);
    };
    let http: Arc<dyn Transport> = Arc::new(HttpTransport::new(endpoint)?);
    let switch: Arc<dyn Transport> = Arc::new(TransportSwitch::new(vec![http]));
    let retry: Arc<dyn Transport> = Arc::new(TransportRetry::new(switch, config.retry.policy()));
    Ok(Some(retry))
}

/// Build `Group[Queued(Retry(Switch[Http])), Debug]`, or a bare debug sink
/// when no endpoint is configured.
pub fn build_pipeline(config: &WaypostConfig) -> Result<Pipeline, TrackerError> {
    let debug_sink: Arc<dyn Transport> = Arc::new(DebugTransport::new());
    let Some(delivery) = build_delivery_transport(config)? else {
        info!("No collector endpoint configured, events go to the debug sink only");
        return Ok(Pipeline {
            transport: debug_sink,
            queue: None,
        });
    };

    let store = open_store(config)?;
    let queue = Arc::new(TrackerQueue::new(
        store,
        delivery,
        config.queue.queue_config(),
    ));
    let queued: Arc<dyn Transport> = Arc::new(QueuedTransport::new(Arc::clone(&queue)));
    let transport: Arc<dyn Transport> = Arc::new(TransportGroup::new(vec![queued, debug_sink]));

    info!(
        transport = %transport.name(),
        pending = queue.len(),
        "Assembled tracker pipeline"
    );
    Ok(Pipeline {
        transport,
        queue: Some(queue),
    })
}

pub struct Tracker {
    tracker_id: String,
    application_id: String,
    transport: Arc<dyn Transport>,
    queue: Option<Arc<TrackerQueue>>,
    resolver: ContextResolver,
    location_stack: Vec<Context>,
    global_contexts: Vec<Context>,
    plugins: Vec<Box<dyn TrackerPlugin>>,
    active: AtomicBool,
}

impl Tracker {
    /// Create a tracker over `transport` with the application context plugin installed.
    pub fn new(settings: &TrackerSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            tracker_id: settings.tracker_id.clone(),
            application_id: settings.application_id.clone(),
            transport,
            queue: None,
            resolver: ContextResolver::new(settings.promise_timeout()),
            location_stack: Vec::new(),
            global_contexts: Vec::new(),
            plugins: vec![Box::new(ApplicationContextPlugin::new(
                settings.application_id.clone(),
            ))],
            active: AtomicBool::new(true),
        }
    }

    /// Validate `config` and build a tracker over the configured pipeline.
    pub fn from_config(config: &WaypostConfig) -> Result<Self, TrackerError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            TrackerError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        let pipeline = build_pipeline(config)?;
        let mut tracker = Self::new(&config.tracker, pipeline.transport);
        tracker.queue = pipeline.queue;
        Ok(tracker)
    }

    /// Location prepended to every event's own location stack.
    pub fn with_location(mut self, context: Context) -> Self {
        self.location_stack.push(context);
        self
    }

    /// Global context added ahead of every event's own global contexts.
    pub fn with_global_context(mut self, context: Context) -> Self {
        self.global_contexts.push(context);
        self
    }

    pub fn with_plugin(mut self, plugin: Box<dyn TrackerPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn tracker_id(&self) -> &str {
        &self.tracker_id
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn queue(&self) -> Option<&Arc<TrackerQueue>> {
        self.queue.as_ref()
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Resolve `draft` and hand the event to the transport.
    ///
    /// Returns `Ok(None)` while the tracker is inactive.
    pub async fn track_event(&self, draft: EventDraft) -> Result<Option<TrackerEvent>, TrackerError> {
        if !self.is_active() {
            debug!(event_type = %draft.event_type, "Tracker inactive, event dropped");
            return Ok(None);
        }
        if !self.transport.is_usable() {
            warn!(
                tracker_id = %self.tracker_id,
                transport = %self.transport.name(),
                "Transport not usable, event not tracked"
            );
            return Err(TransportError::NotUsable.into());
        }

        let EventDraft {
            event_type,
            location_stack,
            global_contexts,
        } = draft;
        let (locations, globals) = tokio::join!(
            self.resolver.resolve(location_stack),
            self.resolver.resolve(global_contexts)
        );

        let mut contexts = EventContexts {
            location_stack: self.location_stack.iter().cloned().chain(locations).collect(),
            global_contexts: self.global_contexts.iter().cloned().chain(globals).collect(),
        };
        for plugin in &self.plugins {
            plugin.enrich(&mut contexts);
        }

        let event = TrackerEvent::new(event_type, contexts);
        let failed = event.error_contexts().count();
        if failed > 0 {
            warn!(
                event_type = %event.event_type(),
                event_id = %event.id(),
                failed_contexts = failed,
                "Event tracked with unresolved contexts"
            );
        }

        self.transport
            .handle(&EventBatch::single(event.clone()))
            .await?;
        debug!(
            tracker_id = %self.tracker_id,
            event_type = %event.event_type(),
            event_id = %event.id(),
            "Tracked event"
        );
        Ok(Some(event))
    }
}
