// ── Relay operations ──
//
// Glue between the poller, stored records, and sinks. Each function is
// one unit of work a scheduler can invoke.

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::lifecycle::StatusPoller;
use crate::model::{InvocationContext, ProjectionRecord, StatusEvent, StoredRecord};
use crate::sink::{BatchSink, EventSink, SinkError};

/// Fetch the device's status and hand it to `sink`.
///
/// A teardown failure does not retract an event the poll already produced:
/// the event is delivered first, then the teardown error is returned.
pub async fn relay_status(
    poller: &StatusPoller,
    ctx: &InvocationContext,
    sink: &dyn EventSink,
) -> Result<StatusEvent, CoreError> {
    match poller.fetch_status(ctx).await {
        Ok(event) => {
            sink.deliver(&event).await?;
            Ok(event)
        }
        Err(CoreError::TeardownFailure {
            message,
            event: Some(event),
        }) => {
            warn!(event_id = %event.id(), "delivering status despite failed teardown");
            sink.deliver(&event).await?;
            Err(CoreError::TeardownFailure {
                message,
                event: Some(event),
            })
        }
        Err(err) => Err(err),
    }
}

/// Decode one serialized status event (e.g. a topic message) and store it.
pub async fn ingest_message(message: &str, sink: &dyn EventSink) -> Result<StatusEvent, CoreError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(SinkError::InvalidMessage("message is empty".into()).into());
    }

    let event: StatusEvent = serde_json::from_str(message)
        .map_err(|e| SinkError::InvalidMessage(format!("not a status event: {e}")))?;
    sink.deliver(&event).await?;
    debug!(event_id = %event.id(), "ingested status event");
    Ok(event)
}

/// Project stored records and send them to `sink` as one batch.
///
/// Returns the number of records delivered. An empty input sends nothing.
pub async fn stream_records(
    records: &[StoredRecord],
    sink: &dyn BatchSink,
) -> Result<usize, CoreError> {
    if records.is_empty() {
        debug!("no records to stream");
        return Ok(0);
    }

    let batch: Vec<ProjectionRecord> = records.iter().map(ProjectionRecord::from).collect();
    sink.deliver_batch(&batch).await?;
    info!(count = batch.len(), "streamed projection records");
    Ok(batch.len())
}
