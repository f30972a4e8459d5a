//! Stdout sinks: print events and projection batches in the chosen format.

use async_trait::async_trait;

use sensilink_core::{BatchSink, EventSink, ProjectionRecord, SinkError, StatusEvent};

use crate::cli::OutputFormat;
use crate::commands::util;
use crate::output;

#[derive(Debug)]
pub struct StdoutSink {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl StdoutSink {
    pub fn new(format: OutputFormat, color: bool, quiet: bool) -> Self {
        Self {
            format,
            color,
            quiet,
        }
    }
}

fn render_failure(e: impl std::fmt::Display) -> SinkError {
    SinkError::InvalidMessage(format!("could not render output: {e}"))
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn deliver(&self, event: &StatusEvent) -> Result<(), SinkError> {
        let rendered = output::render_single(
            &self.format,
            event,
            |e| util::event_detail(e, self.color),
            |e| e.id().to_string(),
        )
        .map_err(render_failure)?;
        output::print_output(&rendered, self.quiet);
        Ok(())
    }
}

#[async_trait]
impl BatchSink for StdoutSink {
    async fn deliver_batch(&self, records: &[ProjectionRecord]) -> Result<(), SinkError> {
        let rendered = output::render_list(
            &self.format,
            records,
            |r| util::ProjectionRow::new(r, self.color),
            |r| r.id.to_string(),
        )
        .map_err(render_failure)?;
        output::print_output(&rendered, self.quiet);
        Ok(())
    }
}
