//! CLI parse: clap types for Waypost. No behavior beyond argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::context::Context;

/// Waypost CLI - inspect and drain the tracker event queue
#[derive(Parser)]
#[command(name = "waypost")]
#[command(about = "Event tracking pipeline: inspect and drain the tracker queue")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (merged over user config, under WAYPOST_* env)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Persistent queue commands (stats, list, flush, clear)
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Track one event through the configured pipeline, then flush
    Track {
        /// Event type, e.g. PressEvent
        event_type: String,
        /// Location context as Type:id, outermost first (repeatable)
        #[arg(long = "location", value_parser = parse_context_spec)]
        locations: Vec<Context>,
        /// Global context as Type:id (repeatable)
        #[arg(long = "global", value_parser = parse_context_spec)]
        globals: Vec<Context>,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Show the number of pending events
    Stats,
    /// List pending events in queue order
    List {
        /// Maximum number of events to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Deliver pending events through the configured transport once
    Flush,
    /// Drop every pending event
    Clear,
}

/// Parse `Type:id` into a context. The id may itself contain `:`.
pub fn parse_context_spec(spec: &str) -> Result<Context, String> {
    let (type_name, id) = spec
        .split_once(':')
        .ok_or_else(|| format!("expected Type:id, got '{}'", spec))?;
    let (type_name, id) = (type_name.trim(), id.trim());
    if type_name.is_empty() || id.is_empty() {
        return Err(format!("expected Type:id, got '{}'", spec));
    }
    Ok(Context::new(type_name, id))
}
