//! RV-C Protocol Library
//!
//! RV-C frames reach this library already decoded into MQTT payloads, one
//! topic per device instance (`RVC/DC_DIMMER_STATUS_3/25`). This crate
//! provides:
//! - DGN (Data Group Number) codecs for dimmers, thermostats and water heaters
//! - Brightness and temperature scaling between wire and UI units
//! - Topic helpers for the `<prefix>/<instance>` convention
//! - A message handler trait for components that consume RV-C frames
//!
//! # Failure model
//!
//! Status decoders never fail. Malformed fields are logged and skipped so a
//! single corrupt message on the bus leaves the previous device state intact.
//!
//! # Example
//!
//! ```
//! use rvc::{decode_brightness_payload, DimmerState};
//!
//! let payload = serde_json::json!({ "operating status (brightness)": 40 });
//! let state = decode_brightness_payload(payload.as_object().unwrap(), DimmerState::default(), 55);
//! assert!(state.on);
//! assert_eq!(state.brightness, 40);
//! ```

pub mod dgns;
pub mod error;
pub mod fields;
pub mod frame;
pub mod message_handler;
pub mod scaling;
pub mod topic;

// Re-export commonly used types
pub use dgns::RvcMessage;
pub use dgns::dgn1feda::{DimmerState, DimmerStatus, decode_brightness_payload};
pub use dgns::dgn1fedb::{CommandCode, CommandFormat, DimmerCommand, encode_brightness_command};
pub use dgns::dgn1fef9::{ThermostatCommand, encode_thermostat_command};
pub use dgns::dgn1ffe2::{FanMode, HvacMode, ThermostatState, ThermostatStatus, decode_thermostat_status};
pub use dgns::dgn1fff6::WaterHeaterCommand;
pub use dgns::dgn1fff7::{WaterHeaterState, WaterHeaterStatus, decode_water_heater_status};
pub use error::RvcError;
pub use fields::Payload;
pub use frame::RvcFrame;
pub use message_handler::MessageHandler;
