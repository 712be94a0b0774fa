//! Waypost: Event Tracking Pipeline
//!
//! Producers describe events with a location stack and global contexts, any of
//! which may still be computing. The tracker resolves every context with a
//! per-value timeout, stores the event in a per-tracker queue, and the queue
//! drains batches into a composable transport chain (retry, switch, group).
//! A process-wide location tree reports structurally ambiguous locations.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod location;
pub mod logging;
pub mod queue;
pub mod tracker;
pub mod transport;
pub mod types;
