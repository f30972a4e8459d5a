// ── Status event domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity of the invocation that asked for a status reading.
///
/// Echoed into every [`StatusEvent`] so a stored record can be traced
/// back to the scheduler tick (or CLI run) that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub event_id: String,
    pub event_time: DateTime<Utc>,
}

impl InvocationContext {
    pub fn new(event_id: impl Into<String>, event_time: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.into(),
            event_time,
        }
    }

    /// A context for an ad-hoc invocation: random id, current time.
    pub fn now() -> Self {
        Self::new(Uuid::new_v4().to_string(), Utc::now())
    }
}

/// Normalized record of a device's operational state at a point in time.
///
/// Immutable once constructed: fields are only readable. `device_status`
/// is the vendor's status object passed through without validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    id: Uuid,
    device_id: String,
    device_status: Value,
    source_event_id: String,
    source_event_time: DateTime<Utc>,
}

impl StatusEvent {
    /// Stamp a fresh event id for `device_status` observed under `ctx`.
    pub fn new(device_id: impl Into<String>, device_status: Value, ctx: &InvocationContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: device_id.into(),
            device_status,
            source_event_id: ctx.event_id.clone(),
            source_event_time: ctx.event_time,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_status(&self) -> &Value {
        &self.device_status
    }

    pub fn source_event_id(&self) -> &str {
        &self.source_event_id
    }

    pub fn source_event_time(&self) -> DateTime<Utc> {
        self.source_event_time
    }

    /// Look up a top-level field of the status payload.
    pub fn status_field(&self, name: &str) -> Option<&Value> {
        self.device_status.get(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let ctx = InvocationContext::new("evt-1", Utc::now());
        let event = StatusEvent::new("dev-1", json!({ "Mode": "Heat" }), &ctx);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["deviceId"], "dev-1");
        assert_eq!(value["deviceStatus"]["Mode"], "Heat");
        assert_eq!(value["sourceEventId"], "evt-1");
        assert!(value.get("sourceEventTime").is_some());
        assert_eq!(value["id"], event.id().to_string());
    }

    #[test]
    fn every_event_gets_a_fresh_id() {
        let ctx = InvocationContext::now();
        let a = StatusEvent::new("dev-1", json!({}), &ctx);
        let b = StatusEvent::new("dev-1", json!({}), &ctx);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.source_event_id(), b.source_event_id());
    }
}
