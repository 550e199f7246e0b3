use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fields::{self, Payload};
use crate::scaling::{clamp_brightness, clamp_on_brightness};

pub const DGN: u32 = 0x1FEDA;
pub const NAME: &str = "DC_DIMMER_STATUS_3";

/// Brightness percentage (0-100) reported by the dimmer.
pub const BRIGHTNESS_KEY: &str = "operating status (brightness)";
/// Load status reported by the dimmer, textual or coded.
pub const LOAD_STATUS_KEY: &str = "load status";

const LOAD_ON: [&str; 5] = ["active", "on", "01", "1", "true"];
const LOAD_OFF: [&str; 5] = ["inactive", "off", "00", "0", "false"];

/// Normalized dimmer state. Brightness is a 0-100 percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimmerState {
    pub on: bool,
    pub brightness: u8,
}

/// Fields of a DC_DIMMER_STATUS_3 payload that survived parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimmerStatus {
    pub instance: Option<u8>,
    /// Clamped brightness; `None` when absent or unparseable.
    pub brightness: Option<u8>,
    /// `None` when absent or not a recognized on/off spelling.
    pub load_status: Option<bool>,
}

impl DimmerStatus {
    pub fn from_payload(payload: &Payload) -> Self {
        let brightness = payload.get(BRIGHTNESS_KEY).and_then(|value| {
            match fields::parse_integer(BRIGHTNESS_KEY, value) {
                Ok(raw) => Some(clamp_brightness(raw)),
                Err(e) => {
                    warn!("Invalid brightness value in dimmer status: {}", e);
                    None
                }
            }
        });

        let load_status = payload.get(LOAD_STATUS_KEY).and_then(parse_load_status);

        Self {
            instance: fields::payload_instance(payload),
            brightness,
            load_status,
        }
    }

    /// Fold this status into the previous state.
    ///
    /// Brightness decides on/off whenever it is present and non-zero; load
    /// status only applies when brightness is absent or zero. A light that
    /// ends up on at level 0 is given `default_brightness` (clamped to 1-100).
    pub fn apply(&self, previous: DimmerState, default_brightness: u8) -> DimmerState {
        let mut state = previous;

        if let Some(brightness) = self.brightness {
            state.brightness = brightness;
            state.on = brightness > 0;
        }

        let lit_by_brightness = self.brightness.is_some_and(|b| b > 0);
        if !lit_by_brightness && let Some(on) = self.load_status {
            state.on = on;
        }

        if state.on && state.brightness == 0 {
            state.brightness = clamp_on_brightness(default_brightness as i64);
            debug!("Dimmer on without level, using default brightness {}", state.brightness);
        }

        state
    }
}

fn parse_load_status(value: &Value) -> Option<bool> {
    let text = fields::text_of(value)?.to_ascii_lowercase();
    if LOAD_ON.contains(&text.as_str()) {
        Some(true)
    } else if LOAD_OFF.contains(&text.as_str()) {
        Some(false)
    } else {
        debug!("Unrecognized load status {:?}, ignoring", text);
        None
    }
}

/// Decode a dimmer status payload on top of the previous state.
///
/// Never fails; malformed fields are logged and the previous values kept.
pub fn decode_brightness_payload(
    payload: &Payload,
    previous: DimmerState,
    default_brightness: u8,
) -> DimmerState {
    DimmerStatus::from_payload(payload).apply(previous, default_brightness)
}

impl fmt::Display for DimmerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Dimmer")?;
        if let Some(instance) = self.instance {
            write!(f, " {}", instance)?;
        }
        match self.brightness {
            Some(b) => write!(f, ": {}%", b)?,
            None => write!(f, ": N/A")?,
        }
        if let Some(load) = self.load_status {
            write!(f, " | Load: {}", if load { "active" } else { "inactive" })?;
        }
        Ok(())
    }
}
