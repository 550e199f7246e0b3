use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fields::{self, Payload};

pub const DGN: u32 = 0x1FFF7;
pub const NAME: &str = "WATERHEATER_STATUS";

pub const WATER_TEMPERATURE_F_KEY: &str = "water_temperature F";
pub const BURNER_STATUS_KEY: &str = "burner_status";
pub const OPERATING_MODES_KEY: &str = "operating_modes";

/// Target used before one has been requested.
pub const DEFAULT_TARGET_F: f64 = 120.0;

/// Normalized water heater state. Temperatures are Fahrenheit.
///
/// The bus never reports the target temperature, so it only changes
/// through commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterHeaterState {
    pub on: bool,
    pub current_temperature_f: Option<f64>,
    pub target_temperature_f: f64,
    /// Set once a water temperature has been reported.
    pub available: bool,
}

impl Default for WaterHeaterState {
    fn default() -> Self {
        Self {
            on: false,
            current_temperature_f: None,
            target_temperature_f: DEFAULT_TARGET_F,
            available: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterHeaterStatus {
    pub instance: Option<u8>,
    pub water_temperature_f: Option<f64>,
    pub burner_status: Option<String>,
    pub operating_modes: Option<String>,
}

impl WaterHeaterStatus {
    pub fn from_payload(payload: &Payload) -> Self {
        let water_temperature_f = payload.get(WATER_TEMPERATURE_F_KEY).and_then(|value| {
            fields::parse_float(WATER_TEMPERATURE_F_KEY, value)
                .map_err(|e| warn!("Invalid water temperature: {}", e))
                .ok()
        });

        Self {
            instance: fields::payload_instance(payload),
            water_temperature_f,
            burner_status: payload.get(BURNER_STATUS_KEY).and_then(fields::text_of),
            operating_modes: payload.get(OPERATING_MODES_KEY).and_then(fields::text_of),
        }
    }

    /// The heater is off only when the burner reports `"00"` and the
    /// operating mode is `"0"`. With neither field present the previous
    /// on/off state is kept.
    pub fn apply(&self, previous: WaterHeaterState) -> WaterHeaterState {
        let mut state = previous;
        if let Some(temperature) = self.water_temperature_f {
            state.current_temperature_f = Some(temperature);
            state.available = true;
        }
        if self.burner_status.is_some() || self.operating_modes.is_some() {
            let off = self.burner_status.as_deref() == Some("00")
                && self.operating_modes.as_deref() == Some("0");
            state.on = !off;
        }
        state
    }
}

/// Decode a water heater status on top of the previous state.
pub fn decode_water_heater_status(payload: &Payload, previous: WaterHeaterState) -> WaterHeaterState {
    WaterHeaterStatus::from_payload(payload).apply(previous)
}

impl fmt::Display for WaterHeaterStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Water heater")?;
        if let Some(instance) = self.instance {
            write!(f, " {}", instance)?;
        }
        match self.water_temperature_f {
            Some(t) => write!(f, ": {:.1}°F", t)?,
            None => write!(f, ": N/A")?,
        }
        if let Some(burner) = &self.burner_status {
            write!(f, " | Burner: {}", burner)?;
        }
        Ok(())
    }
}
