use serde_json::Value;

use crate::dgns::RvcMessage;
use crate::fields::Payload;

/// A publish received from the RV-C bridge, classified once on arrival.
#[derive(Debug, Clone)]
pub struct RvcFrame {
    pub topic: String,
    pub message: RvcMessage,
    /// The JSON object, when the payload was one.
    pub payload: Option<Payload>,
    /// Raw payload bytes as received.
    pub data: Vec<u8>,
}

impl RvcFrame {
    /// Classify a raw publish. Never fails: payloads that are neither a JSON
    /// object nor a compact command yield `payload: None` and
    /// `RvcMessage::Unknown`.
    pub fn new(topic: impl Into<String>, data: &[u8]) -> Self {
        let payload = match serde_json::from_slice::<Value>(data) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
        let message = match &payload {
            Some(map) => RvcMessage::from_json(map),
            None => RvcMessage::from_text(&String::from_utf8_lossy(data)),
        };
        Self {
            topic: topic.into(),
            message,
            payload,
            data: data.to_vec(),
        }
    }

    /// Payload as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
