//! CLI presentation: text formatters per command.

use chrono::{TimeZone, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

use crate::event::TrackerEvent;
use crate::location::location_path;
use crate::queue::FlushReport;

fn format_section_heading(title: &str) -> String {
    format!("{}\n{}", title, "-".repeat(title.len()))
}

fn format_time(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

pub fn format_queue_stats(slot: &str, pending: usize) -> String {
    format!("Queue {}: {} pending event(s)", slot, pending)
}

/// Pending events as a table, oldest first.
pub fn format_queue_list(events: &[TrackerEvent], pending: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Pending events")));
    if events.is_empty() {
        out.push_str("Queue is empty.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Type", "Time", "Location", "Globals"]);
    for event in events {
        table.add_row(vec![
            event.id().to_string(),
            event.event_type().to_string(),
            format_time(event.time()),
            location_path(event.location_stack()),
            event.global_contexts().len().to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    if events.len() < pending {
        out.push_str(&format!("Showing {} of {} pending event(s)\n", events.len(), pending));
    }
    out
}

pub fn format_flush_report(report: &FlushReport, remaining: usize) -> String {
    format!(
        "Flushed {} batch(es): {} delivered, {} failed, {} remaining",
        report.batches, report.delivered, report.failed, remaining
    )
}

pub fn format_clear_result(cleared: usize) -> String {
    format!("Cleared {} pending event(s)", cleared)
}

pub fn format_tracked_event(event: &TrackerEvent) -> String {
    let mut out = format!("Tracked {} {}", event.event_type(), event.id());
    let path = location_path(event.location_stack());
    if !path.is_empty() {
        out.push_str(&format!(" at {}", path));
    }
    let failed = event.error_contexts().count();
    if failed > 0 {
        out.push_str(&format!(" ({} unresolved context(s))", failed));
    }
    out
}
