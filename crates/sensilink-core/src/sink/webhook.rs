// HTTP sink: publishes events (or projection batches) as JSON POSTs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use super::{BatchSink, EventSink, SinkError};
use crate::model::{ProjectionRecord, StatusEvent};

/// POSTs each delivery to a fixed endpoint.
///
/// Used for topic publication (one serialized `StatusEvent` per request)
/// and for batch streaming (a JSON array of projection records).
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: reqwest::Client,
    url: Url,
}

impl WebhookSink {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sensilink/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, url))
    }

    pub fn with_client(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Publish an already-serialized message body.
    pub async fn publish(&self, body: String) -> Result<(), SinkError> {
        debug!(url = %self.url, bytes = body.len(), "POST");
        let resp = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    async fn deliver(&self, event: &StatusEvent) -> Result<(), SinkError> {
        self.publish(serde_json::to_string(event)?).await
    }
}

#[async_trait]
impl BatchSink for WebhookSink {
    async fn deliver_batch(&self, records: &[ProjectionRecord]) -> Result<(), SinkError> {
        self.publish(serde_json::to_string(records)?).await
    }
}
