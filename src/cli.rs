//! CLI domain: parse, route, output, and presentation only.
//! Route handlers stay thin; pipeline behavior lives in the library modules.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{parse_context_spec, Cli, Commands, QueueCommands};
pub use presentation::{
    format_clear_result, format_flush_report, format_queue_list, format_queue_stats,
    format_tracked_event,
};
pub use route::RunContext;
