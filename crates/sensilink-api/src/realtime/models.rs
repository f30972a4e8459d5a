// Realtime hub wire types
//
// Responses are vendor-defined and only partially present, so every
// field is optional and decoded on its own. The poll envelope keeps the
// queued messages as raw JSON: interpreting them is the parser's job.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Hub that publishes thermostat updates.
pub const HUB_NAME: &str = "thermostat-v1";

/// Hub method that starts delivering updates for one device.
pub const SUBSCRIBE_METHOD: &str = "Subscribe";

/// `GET /realtime/negotiate`
#[derive(Debug, Clone, Deserialize)]
pub struct NegotiateResponse {
    #[serde(rename = "ConnectionToken", default)]
    pub connection_token: Option<String>,
}

/// `GET /realtime/connect`
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectResponse {
    /// Initial message cursor.
    #[serde(rename = "C", default)]
    pub cursor: Option<String>,
}

/// `POST /realtime/send`
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    /// Invocation id echoed back as acknowledgment.
    #[serde(rename = "I", default)]
    pub ack: Option<Value>,

    #[serde(rename = "timedOut", alias = "TimedOut", default, deserialize_with = "truthy")]
    pub timed_out: bool,
}

impl SendResponse {
    pub fn is_acknowledged(&self) -> bool {
        self.ack.as_ref().is_some_and(|v| !v.is_null())
    }
}

/// `GET /realtime/poll` -- the message envelope.
///
/// `cursor` and `group_token` are carried forward by the session only
/// when present. `messages` is untrusted: it may be absent, empty, or
/// not even an array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(rename = "C", default)]
    pub cursor: Option<String>,

    #[serde(rename = "G", default)]
    pub group_token: Option<String>,

    #[serde(rename = "M", default)]
    pub messages: Option<Value>,

    #[serde(rename = "timedOut", alias = "TimedOut", default, deserialize_with = "truthy")]
    pub timed_out: bool,
}

impl Envelope {
    /// Queued messages, or an empty slice when `M` is missing or malformed.
    pub fn messages(&self) -> &[Value] {
        self.messages
            .as_ref()
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }
}

/// Hub invocation sent form-encoded as the `data` field of `/realtime/send`.
#[derive(Debug, Clone, Serialize)]
pub struct Invocation<'a> {
    #[serde(rename = "H")]
    pub hub: &'a str,
    #[serde(rename = "M")]
    pub method: &'a str,
    #[serde(rename = "A")]
    pub args: Vec<&'a str>,
    #[serde(rename = "I")]
    pub invocation_id: u32,
}

impl<'a> Invocation<'a> {
    /// The one-shot `Subscribe(device_id)` call, invocation id 0.
    pub fn subscribe(device_id: &'a str) -> Self {
        Self {
            hub: HUB_NAME,
            method: SUBSCRIBE_METHOD,
            args: vec![device_id],
            invocation_id: 0,
        }
    }
}

#[derive(Serialize)]
struct HubRef<'a> {
    name: &'a str,
}

/// The `connectionData` query value naming the hub.
pub fn connection_data() -> String {
    serde_json::to_string(&[HubRef { name: HUB_NAME }])
        .unwrap_or_else(|_| format!(r#"[{{"name":"{HUB_NAME}"}}]"#))
}

/// Loose boolean: `true`, non-zero numbers, non-empty strings, and any
/// array or object count as set.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_tolerates_missing_and_malformed_messages() {
        let env: Envelope = serde_json::from_value(json!({ "C": "cur-2" })).unwrap();
        assert!(env.messages().is_empty());
        assert_eq!(env.cursor.as_deref(), Some("cur-2"));

        let env: Envelope = serde_json::from_value(json!({ "M": "not-a-list" })).unwrap();
        assert!(env.messages().is_empty());
        assert!(env.cursor.is_none());
        assert!(env.group_token.is_none());
    }

    #[test]
    fn timed_out_flag_accepts_loose_values() {
        let env: Envelope = serde_json::from_value(json!({ "timedOut": 1 })).unwrap();
        assert!(env.timed_out);
        let send: SendResponse = serde_json::from_value(json!({ "TimedOut": true })).unwrap();
        assert!(send.timed_out);
        let send: SendResponse = serde_json::from_value(json!({ "I": "0" })).unwrap();
        assert!(!send.timed_out);
        assert!(send.is_acknowledged());
    }

    #[test]
    fn unacknowledged_send() {
        let send: SendResponse = serde_json::from_value(json!({ "I": null })).unwrap();
        assert!(!send.is_acknowledged());
    }

    #[test]
    fn subscribe_invocation_shape() {
        let body = serde_json::to_value(Invocation::subscribe("dev-1")).unwrap();
        assert_eq!(
            body,
            json!({ "H": "thermostat-v1", "M": "Subscribe", "A": ["dev-1"], "I": 0 })
        );
    }

    #[test]
    fn connection_data_names_hub() {
        assert_eq!(connection_data(), r#"[{"name":"thermostat-v1"}]"#);
    }
}
