//! Readers for the loosely typed fields found in RV-C JSON payloads.
//!
//! The bridge that turns CAN frames into MQTT is not consistent about types:
//! the same field may arrive as `40`, `40.0` or `"40"`, and "not available"
//! is spelled `"n/a"`. These helpers normalize that.

use serde_json::{Map, Value};

use crate::error::{Result, RvcError};

/// A decoded JSON status or command object.
pub type Payload = Map<String, Value>;

/// Key carrying the message type name (e.g. `DC_DIMMER_STATUS_3`).
pub const NAME_KEY: &str = "name";
/// Key carrying the device instance.
pub const INSTANCE_KEY: &str = "instance";

/// Parse an integer from a JSON number (fractions truncate), numeric string or bool.
pub fn parse_integer(field: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| RvcError::malformed(field, n)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RvcError::malformed(field, format!("{s:?}"))),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(RvcError::malformed(field, other)),
    }
}

/// Parse a float from a JSON number or numeric string.
pub fn parse_float(field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| RvcError::malformed(field, value))
}

/// Render a scalar JSON value as text, the way it would appear in the
/// compact string form. Objects, arrays and null yield `None`.
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The declared message type of a payload, if any.
pub fn message_name(payload: &Payload) -> Option<&str> {
    payload.get(NAME_KEY).and_then(Value::as_str)
}

/// The instance declared inside a payload, if it is a valid `u8`.
pub fn payload_instance(payload: &Payload) -> Option<u8> {
    payload
        .get(INSTANCE_KEY)
        .and_then(|v| parse_integer(INSTANCE_KEY, v).ok())
        .and_then(|i| u8::try_from(i).ok())
}
