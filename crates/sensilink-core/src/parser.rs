// ── Status message parser ──
//
// Turns a poll envelope into at most one StatusEvent. Pure: no I/O, no
// errors. Anything that does not look like a status update is `None`.

use serde_json::Value;
use sensilink_api::Envelope;
use tracing::debug;

use crate::model::{InvocationContext, StatusEvent};

/// Field of the status argument holding the device's operational state.
pub const STATUS_FIELD: &str = "OperationalStatus";

/// Extract a status event from the first message of `envelope`.
///
/// The message's arguments are `[device_id, {"OperationalStatus": {..}}]`.
/// Returns `None` when the envelope has no messages, the first message has
/// fewer than two arguments, or the status is missing or not an object.
///
/// The event's device id is taken from the message itself; `device_id` is
/// only used when the message does not name one.
pub fn parse(envelope: &Envelope, device_id: &str, ctx: &InvocationContext) -> Option<StatusEvent> {
    let message = envelope.messages().first()?;
    let args = message.get("A").and_then(Value::as_array)?;
    let [source, payload, ..] = args.as_slice() else {
        debug!(args = args.len(), "status message has too few arguments");
        return None;
    };

    let status = payload.get(STATUS_FIELD).filter(|s| s.is_object())?;

    let source_id = source.as_str().unwrap_or(device_id);
    if source_id != device_id {
        debug!(
            requested = device_id,
            received = source_id,
            "status message names a different device"
        );
    }

    Some(StatusEvent::new(source_id, status.clone(), ctx))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn extracts_operational_status() {
        let env = envelope(json!({
            "M": [{ "A": ["dev-1", { "OperationalStatus": {
                "Temperature": 72, "Humidity": 45, "Mode": "Heat"
            }}]}],
            "C": "cur-2",
            "G": "grp-1"
        }));
        let ctx = InvocationContext::now();
        let event = parse(&env, "dev-1", &ctx).unwrap();

        assert_eq!(event.device_id(), "dev-1");
        assert_eq!(
            event.device_status(),
            &json!({ "Temperature": 72, "Humidity": 45, "Mode": "Heat" })
        );
        assert_eq!(event.source_event_id(), ctx.event_id);
        assert_eq!(event.source_event_time(), ctx.event_time);
    }

    #[test]
    fn empty_envelope_yields_nothing() {
        let ctx = InvocationContext::now();
        assert!(parse(&envelope(json!({ "M": [] })), "dev-1", &ctx).is_none());
        assert!(parse(&envelope(json!({})), "dev-1", &ctx).is_none());
    }

    #[test]
    fn single_argument_yields_nothing() {
        let env = envelope(json!({ "M": [{ "A": ["dev-1"] }] }));
        assert!(parse(&env, "dev-1", &InvocationContext::now()).is_none());
    }

    #[test]
    fn missing_status_field_yields_nothing() {
        let env = envelope(json!({ "M": [{ "A": ["dev-1", { "Capabilities": {} }] }] }));
        assert!(parse(&env, "dev-1", &InvocationContext::now()).is_none());

        let env = envelope(json!({ "M": [{ "A": ["dev-1", "not an object"] }] }));
        assert!(parse(&env, "dev-1", &InvocationContext::now()).is_none());
    }

    #[test]
    fn falsy_or_scalar_status_yields_nothing() {
        for status in [json!(null), json!(false), json!(0), json!(""), json!("Heat")] {
            let env = envelope(json!({
                "M": [{ "A": ["dev-1", { "OperationalStatus": status }] }]
            }));
            assert!(
                parse(&env, "dev-1", &InvocationContext::now()).is_none(),
                "accepted {status}"
            );
        }
    }

    #[test]
    fn non_string_source_falls_back_to_requested_device() {
        let env = envelope(json!({
            "M": [{ "A": [null, { "OperationalStatus": { "Mode": "Off" } }] }]
        }));
        let event = parse(&env, "dev-9", &InvocationContext::now()).unwrap();
        assert_eq!(event.device_id(), "dev-9");
    }
}
