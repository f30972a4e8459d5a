//! Shared helpers for command handlers.

use std::fmt::Write as _;

use serde_json::Value;
use tabled::Tabled;

use sensilink_core::{ProjectionRecord, StatusEvent};

use crate::output;

/// Render a JSON value as a short table cell.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Temperature cell: the Fahrenheit reading when keyed by unit.
fn temperature_cell(status: &Value) -> String {
    match status.get("Temperature") {
        Some(Value::Object(units)) => cell(units.get("F")),
        other => cell(other),
    }
}

/// HVAC mode for display: running mode first, then configured mode.
pub fn mode_of(status: &Value) -> Option<&str> {
    status
        .get("Running")
        .and_then(|r| r.get("Mode"))
        .or_else(|| status.get("Mode"))
        .and_then(Value::as_str)
}

/// Multi-line detail view of one status event (table format).
pub fn event_detail(event: &StatusEvent, color: bool) -> String {
    let status = event.device_status();
    let mode = mode_of(status).map_or_else(|| "-".into(), |m| output::paint_mode(m, color));

    let mut out = String::new();
    let _ = writeln!(out, "Device:      {}", event.device_id());
    let _ = writeln!(out, "Event:       {}", event.id());
    let _ = writeln!(out, "Temperature: {}", temperature_cell(status));
    let _ = writeln!(out, "Humidity:    {}", cell(status.get("Humidity")));
    let _ = writeln!(out, "Mode:        {mode}");
    let _ = write!(
        out,
        "Invocation:  {} @ {}",
        event.source_event_id(),
        event.source_event_time().to_rfc3339()
    );
    out
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct ProjectionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl ProjectionRow {
    pub fn new(record: &ProjectionRecord, color: bool) -> Self {
        Self {
            id: record.id.to_string(),
            timestamp: record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            temperature: cell(record.temperature.as_ref()),
            humidity: cell(record.humidity.as_ref()),
            status: record
                .status
                .as_deref()
                .map_or_else(|| "-".into(), |s| output::paint_mode(s, color)),
        }
    }
}
