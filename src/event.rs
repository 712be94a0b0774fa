//! Event model: drafts as produced by callers, resolved events, and batches.

use serde::{Deserialize, Serialize};

use crate::context::{Context, ResolvableContext};
use crate::types::{new_event_id, now_millis, EventId};

/// An event as described by a producer; contexts may still be deferred.
#[derive(Debug)]
pub struct EventDraft {
    pub event_type: String,
    pub location_stack: Vec<ResolvableContext>,
    pub global_contexts: Vec<ResolvableContext>,
}

impl EventDraft {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            location_stack: Vec::new(),
            global_contexts: Vec::new(),
        }
    }

    pub fn with_location(mut self, context: impl Into<ResolvableContext>) -> Self {
        self.location_stack.push(context.into());
        self
    }

    pub fn with_global_context(mut self, context: impl Into<ResolvableContext>) -> Self {
        self.global_contexts.push(context.into());
        self
    }
}

/// Resolved contexts of an event that is about to be assembled; what plugins enrich.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventContexts {
    pub location_stack: Vec<Context>,
    pub global_contexts: Vec<Context>,
}

/// A fully resolved event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEvent {
    #[serde(rename = "_type")]
    event_type: String,
    id: EventId,
    time: u64,
    location_stack: Vec<Context>,
    global_contexts: Vec<Context>,
}

impl TrackerEvent {
    /// Assemble an event, assigning a fresh id and the current time.
    pub fn new(event_type: impl Into<String>, contexts: EventContexts) -> Self {
        Self {
            event_type: event_type.into(),
            id: new_event_id(),
            time: now_millis(),
            location_stack: contexts.location_stack,
            global_contexts: contexts.global_contexts,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn location_stack(&self) -> &[Context] {
        &self.location_stack
    }

    pub fn global_contexts(&self) -> &[Context] {
        &self.global_contexts
    }

    /// Error contexts substituted during resolution, from either list.
    pub fn error_contexts(&self) -> impl Iterator<Item = &Context> {
        self.location_stack
            .iter()
            .chain(self.global_contexts.iter())
            .filter(|context| context.is_error())
    }
}

/// A non-empty, ordered group of events handed to a transport in one call.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch(Vec<TrackerEvent>);

#[allow(clippy::len_without_is_empty)]
impl EventBatch {
    /// `None` when `events` is empty.
    pub fn new(events: Vec<TrackerEvent>) -> Option<Self> {
        if events.is_empty() {
            None
        } else {
            Some(Self(events))
        }
    }

    pub fn single(event: TrackerEvent) -> Self {
        Self(vec![event])
    }

    pub fn events(&self) -> &[TrackerEvent] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ids(&self) -> Vec<EventId> {
        self.0.iter().map(TrackerEvent::id).collect()
    }

    pub fn into_events(self) -> Vec<TrackerEvent> {
        self.0
    }
}

impl<'a> IntoIterator for &'a EventBatch {
    type Item = &'a TrackerEvent;
    type IntoIter = std::slice::Iter<'a, TrackerEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
