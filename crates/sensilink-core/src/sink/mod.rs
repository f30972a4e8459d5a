// ── Delivery sinks ──
//
// Where status events go once produced. A sink either accepts one event
// at a time (record store, topic) or a batch of projection records.

mod fs;
mod webhook;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ProjectionRecord, StatusEvent};

pub use fs::FsRecordStore;
pub use webhook::WebhookSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint rejected delivery with HTTP {status}")]
    Rejected { status: u16 },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Accepts one status event for storage or publication.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &StatusEvent) -> Result<(), SinkError>;
}

/// Accepts projection records in bulk for streaming delivery.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn deliver_batch(&self, records: &[ProjectionRecord]) -> Result<(), SinkError>;
}
