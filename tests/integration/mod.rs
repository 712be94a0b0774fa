//! Integration tests for the Waypost event tracking pipeline

mod location_tree;
mod persistent_queue;
mod resolver_properties;
mod test_utils;
mod tracker_pipeline;
mod tracker_queue;
