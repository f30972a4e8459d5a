use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::status::StatusEvent;

/// A status event as persisted by a record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub stored_at: DateTime<Utc>,
    pub event: StatusEvent,
}

impl StoredRecord {
    pub fn new(event: StatusEvent) -> Self {
        Self {
            stored_at: Utc::now(),
            event,
        }
    }

    pub fn project(&self) -> ProjectionRecord {
        ProjectionRecord::from(self)
    }
}

/// Flattened view of a stored record for batch analytics consumers.
///
/// Fields the status payload does not carry are emitted as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<Value>,
    pub humidity: Option<Value>,
    pub status: Option<String>,
}

impl From<&StoredRecord> for ProjectionRecord {
    fn from(record: &StoredRecord) -> Self {
        let event = &record.event;

        // Temperature arrives either as a bare number or as an object
        // keyed by unit; the Fahrenheit reading is the one projected.
        let temperature = event
            .status_field("Temperature")
            .and_then(|t| match t {
                Value::Object(units) => units.get("F").cloned(),
                Value::Null => None,
                other => Some(other.clone()),
            });

        let humidity = event
            .status_field("Humidity")
            .filter(|h| !h.is_null())
            .cloned();

        let status = event
            .status_field("Running")
            .and_then(|r| r.get("Mode"))
            .or_else(|| event.status_field("Mode"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        Self {
            id: event.id(),
            timestamp: record.stored_at,
            temperature,
            humidity,
            status,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::InvocationContext;

    fn record(status: Value) -> StoredRecord {
        let event = StatusEvent::new("dev-1", status, &InvocationContext::now());
        StoredRecord::new(event)
    }

    #[test]
    fn projects_nested_temperature_and_running_mode() {
        let rec = record(json!({
            "Temperature": { "F": 71, "C": 21.5 },
            "Humidity": 40,
            "Running": { "Mode": "Heat" },
            "Mode": "Auto"
        }));
        let projected = rec.project();

        assert_eq!(projected.id, rec.event.id());
        assert_eq!(projected.timestamp, rec.stored_at);
        assert_eq!(projected.temperature, Some(json!(71)));
        assert_eq!(projected.humidity, Some(json!(40)));
        assert_eq!(projected.status.as_deref(), Some("Heat"));
    }

    #[test]
    fn falls_back_to_scalar_temperature_and_top_level_mode() {
        let projected = record(json!({ "Temperature": 72, "Mode": "Cool" })).project();

        assert_eq!(projected.temperature, Some(json!(72)));
        assert_eq!(projected.humidity, None);
        assert_eq!(projected.status.as_deref(), Some("Cool"));
    }

    #[test]
    fn missing_fields_serialize_as_null() {
        let projected = record(json!({})).project();
        let value = serde_json::to_value(&projected).unwrap();

        assert!(value["Temperature"].is_null());
        assert!(value["Humidity"].is_null());
        assert!(value["Status"].is_null());
        assert!(value.get("Id").is_some());
        assert!(value.get("Timestamp").is_some());
    }
}
