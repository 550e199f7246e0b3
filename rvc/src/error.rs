use thiserror::Error;

/// Errors raised while reading RV-C payloads.
///
/// Status decoders do not return these to their callers: they log them and
/// fall back to the previous state. Command parsers do return them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RvcError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unknown {field} value {value:?}")]
    UnknownEnumValue { field: String, value: String },
    #[error("{field} value {value} outside {min}..={max}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid dimmer command: {0}")]
    InvalidCommand(String),
}

impl RvcError {
    pub fn malformed(field: &str, value: impl std::fmt::Display) -> Self {
        RvcError::MalformedPayload(format!("{field} = {value}"))
    }

    pub fn unknown(field: &str, value: impl Into<String>) -> Self {
        RvcError::UnknownEnumValue {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RvcError>;
