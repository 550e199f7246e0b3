use std::fmt;

use tracing::debug;

use super::dgn1feda::{self, DimmerStatus};
use super::dgn1fedb::{self, DimmerCommand};
use super::dgn1ffe2::{self, ThermostatStatus};
use super::dgn1fff7::{self, WaterHeaterStatus};
use crate::fields::{self, Payload};

// Enum to hold any decoded message type
#[derive(Debug, Clone, PartialEq)]
pub enum RvcMessage {
    DimmerStatus(DimmerStatus),
    DimmerCommand(DimmerCommand),
    ThermostatStatus(ThermostatStatus),
    WaterHeaterStatus(WaterHeaterStatus),
    /// Anything else, with the declared name if there was one.
    Unknown { name: Option<String> },
}

impl RvcMessage {
    /// Classify a JSON object by its `name` field.
    pub fn from_json(payload: &Payload) -> Self {
        let Some(name) = fields::message_name(payload) else {
            return RvcMessage::Unknown { name: None };
        };
        match name {
            dgn1feda::NAME => RvcMessage::DimmerStatus(DimmerStatus::from_payload(payload)),
            dgn1fedb::NAME => match DimmerCommand::from_json(payload) {
                Ok(cmd) => RvcMessage::DimmerCommand(cmd),
                Err(e) => {
                    debug!("Unreadable dimmer command: {}", e);
                    RvcMessage::Unknown {
                        name: Some(name.to_string()),
                    }
                }
            },
            dgn1ffe2::NAME | dgn1ffe2::AIR_CONDITIONER_NAME => {
                RvcMessage::ThermostatStatus(ThermostatStatus::from_payload(payload))
            }
            dgn1fff7::NAME => RvcMessage::WaterHeaterStatus(WaterHeaterStatus::from_payload(payload)),
            other => RvcMessage::Unknown {
                name: Some(other.to_string()),
            },
        }
    }

    /// Classify a non-JSON payload. Only the compact dimmer command is
    /// recognized.
    pub fn from_text(text: &str) -> Self {
        DimmerCommand::parse_compact(text)
            .map(RvcMessage::DimmerCommand)
            .unwrap_or(RvcMessage::Unknown { name: None })
    }

    /// The declared message name, if known.
    pub fn name(&self) -> Option<&str> {
        match self {
            RvcMessage::DimmerStatus(_) => Some(dgn1feda::NAME),
            RvcMessage::DimmerCommand(_) => Some(dgn1fedb::NAME),
            RvcMessage::ThermostatStatus(_) => Some(dgn1ffe2::NAME),
            RvcMessage::WaterHeaterStatus(_) => Some(dgn1fff7::NAME),
            RvcMessage::Unknown { name } => name.as_deref(),
        }
    }
}

impl fmt::Display for RvcMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RvcMessage::DimmerStatus(msg) => write!(f, "{}", msg),
            RvcMessage::DimmerCommand(msg) => write!(f, "{}", msg),
            RvcMessage::ThermostatStatus(msg) => write!(f, "{}", msg),
            RvcMessage::WaterHeaterStatus(msg) => write!(f, "{}", msg),
            RvcMessage::Unknown { name: Some(name) } => write!(f, "      Unhandled: {}", name),
            RvcMessage::Unknown { name: None } => write!(f, "      Unhandled payload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn classify(value: Value) -> RvcMessage {
        RvcMessage::from_json(value.as_object().unwrap())
    }

    #[test]
    fn test_classify_by_name() {
        assert!(matches!(
            classify(json!({ "name": "DC_DIMMER_STATUS_3", "instance": 25 })),
            RvcMessage::DimmerStatus(_)
        ));
        assert!(matches!(
            classify(json!({ "name": "AIR_CONDITIONER_STATUS", "operating_mode": "2" })),
            RvcMessage::ThermostatStatus(_)
        ));
        assert!(matches!(
            classify(json!({ "name": "THERMOSTAT_STATUS_1", "instance": 0 })),
            RvcMessage::ThermostatStatus(_)
        ));
        assert!(matches!(
            classify(json!({ "name": "WATERHEATER_STATUS", "instance": 1 })),
            RvcMessage::WaterHeaterStatus(_)
        ));
    }

    #[test]
    fn test_dimmer_command_json() {
        let msg = classify(json!({ "name": "DC_DIMMER_COMMAND_2", "instance": 46, "command": 3 }));
        match msg {
            RvcMessage::DimmerCommand(cmd) => assert_eq!(cmd.instance, 46),
            other => panic!("unexpected message {:?}", other),
        }

        // unreadable command keeps its name
        let msg = classify(json!({ "name": "DC_DIMMER_COMMAND_2", "command": 3 }));
        assert_eq!(msg.name(), Some("DC_DIMMER_COMMAND_2"));
        assert!(matches!(msg, RvcMessage::Unknown { .. }));
    }

    #[test]
    fn test_unknown_messages() {
        let msg = classify(json!({ "name": "TANK_STATUS", "instance": 1 }));
        assert_eq!(msg, RvcMessage::Unknown { name: Some("TANK_STATUS".to_string()) });
        assert_eq!(msg.to_string(), "      Unhandled: TANK_STATUS");

        assert_eq!(classify(json!({ "instance": 1 })), RvcMessage::Unknown { name: None });
        assert_eq!(classify(json!({ "name": 7 })), RvcMessage::Unknown { name: None });
    }

    #[test]
    fn test_from_text() {
        assert!(matches!(RvcMessage::from_text("25 5 100"), RvcMessage::DimmerCommand(_)));
        assert_eq!(RvcMessage::from_text("online"), RvcMessage::Unknown { name: None });
    }
}
