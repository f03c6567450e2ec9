//! Caller-supplied transport: a diff stream for the sync connection plus a
//! one-way broadcast stream of notification payloads.

use std::sync::mpsc::Receiver;

use serde_json::{Map, Value};

/// Key of the message text inside a broadcast payload.
pub const FIELD_MESSAGE: &str = "message";

/// A broadcast payload, a JSON object.
pub type BroadcastPayload = Map<String, Value>;

/// The two channels a client needs from its transport.
pub struct Transport<S> {
    /// Operation stream consumed by the sync connection.
    pub diff_stream: S,
    /// Inbound notification payloads.
    pub broadcast_stream: Receiver<BroadcastPayload>,
}

impl<S> Transport<S> {
    pub const fn new(diff_stream: S, broadcast_stream: Receiver<BroadcastPayload>) -> Self {
        Self {
            diff_stream,
            broadcast_stream,
        }
    }
}

impl<S> std::fmt::Debug for Transport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

/// Build a payload carrying `message` under [`FIELD_MESSAGE`].
pub fn message_payload(message: &str) -> BroadcastPayload {
    let mut payload = Map::new();
    payload.insert(FIELD_MESSAGE.to_string(), Value::String(message.to_string()));
    payload
}

/// The message text of a payload, if present and a string.
pub fn payload_message(payload: &BroadcastPayload) -> Option<&str> {
    payload.get(FIELD_MESSAGE).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_payload_uses_message_key() {
        let payload = message_payload("hello");
        assert_eq!(Value::Object(payload.clone()), json!({"message": "hello"}));
        assert_eq!(payload_message(&payload), Some("hello"));
    }

    #[test]
    fn test_non_string_message_is_ignored() {
        let Value::Object(payload) = json!({"message": 42}) else {
            unreachable!()
        };
        assert_eq!(payload_message(&payload), None);
    }
}
