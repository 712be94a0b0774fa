//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("tracker.tracker_id", "waypost")?
        .set_default("tracker.application_id", "waypost-app")?
        .set_default("tracker.promise_timeout_ms", 5000)?
        .set_default("queue.batch_size", 10)?
        .set_default("queue.batch_delay_ms", 1000)?
        .set_default("queue.concurrency", 4)?
        .set_default("queue.store", "memory")?
        .set_default("retry.max_attempts", 10)?
        .set_default("retry.min_timeout_ms", 1000)?
        .set_default("retry.retry_factor", 2.0)
}
