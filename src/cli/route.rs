//! CLI route: single route table and run context.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cli::parse::{Commands, QueueCommands};
use crate::cli::presentation::{
    format_clear_result, format_flush_report, format_queue_list, format_queue_stats,
    format_tracked_event,
};
use crate::config::{ConfigLoader, WaypostConfig};
use crate::context::Context;
use crate::error::TrackerError;
use crate::event::EventDraft;
use crate::queue::{PersistentQueueStore, QueueStore, TrackerQueue};
use crate::tracker::{build_delivery_transport, Tracker};

/// Runtime context for CLI execution, built from the loaded configuration.
pub struct RunContext {
    config: WaypostConfig,
}

impl RunContext {
    /// Load configuration (defaults, user file, `config_path`, environment).
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, TrackerError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: WaypostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WaypostConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, TrackerError> {
        match command {
            Commands::Queue { command } => self.handle_queue_command(command).await,
            Commands::Track {
                event_type,
                locations,
                globals,
            } => self.handle_track(event_type, locations, globals).await,
        }
    }

    /// Queue commands always act on the persistent slot of the configured tracker.
    fn open_persistent_store(&self) -> Result<PersistentQueueStore, TrackerError> {
        let path = self.config.queue.resolved_store_path().ok_or_else(|| {
            TrackerError::ConfigError("No queue store path configured".to_string())
        })?;
        Ok(PersistentQueueStore::open(
            path,
            &self.config.tracker.tracker_id,
        )?)
    }

    async fn handle_queue_command(&self, command: &QueueCommands) -> Result<String, TrackerError> {
        let store = self.open_persistent_store()?;
        match command {
            QueueCommands::Stats => Ok(format_queue_stats(store.slot(), store.len())),
            QueueCommands::List { limit } => {
                let events = store.read(*limit, None)?;
                Ok(format_queue_list(&events, store.len()))
            }
            QueueCommands::Clear => {
                let cleared = store.len();
                store.clear()?;
                info!(slot = %store.slot(), cleared, "Cleared queue");
                Ok(format_clear_result(cleared))
            }
            QueueCommands::Flush => {
                let delivery = build_delivery_transport(&self.config)?.ok_or_else(|| {
                    TrackerError::ConfigError(
                        "No collector endpoint configured (tracker.endpoint)".to_string(),
                    )
                })?;
                let store: Arc<dyn QueueStore> = Arc::new(store);
                let queue = TrackerQueue::new(
                    Arc::clone(&store),
                    delivery,
                    self.config.queue.queue_config(),
                );
                let report = queue.flush().await;
                Ok(format_flush_report(&report, store.len()))
            }
        }
    }

    async fn handle_track(
        &self,
        event_type: &str,
        locations: &[Context],
        globals: &[Context],
    ) -> Result<String, TrackerError> {
        let tracker = Tracker::from_config(&self.config)?;
        if let Some(queue) = tracker.queue() {
            queue.stop_runner();
        }
        let mut draft = EventDraft::new(event_type);
        for location in locations {
            draft = draft.with_location(location.clone());
        }
        for global in globals {
            draft = draft.with_global_context(global.clone());
        }

        let Some(event) = tracker.track_event(draft).await? else {
            return Ok("Tracker inactive, nothing tracked".to_string());
        };
        let mut out = format_tracked_event(&event);
        if let Some(queue) = tracker.queue() {
            let report = queue.flush().await;
            out.push('\n');
            out.push_str(&format_flush_report(&report, queue.len()));
        }
        Ok(out)
    }
}
