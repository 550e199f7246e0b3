use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, RvcError};
use crate::fields::{self, Payload};
use crate::scaling::clamp_reported;

pub const DGN: u32 = 0x1FFE2;
pub const NAME: &str = "THERMOSTAT_STATUS_1";
/// Air conditioner status (DGN 1FFE1) carries the same mode and fan fields.
pub const AIR_CONDITIONER_NAME: &str = "AIR_CONDITIONER_STATUS";

pub const OPERATING_MODE_KEYS: [&str; 2] = ["operating mode", "operating_mode"];
pub const FAN_SPEED_KEYS: [&str; 2] = ["fan speed", "fan_speed"];
pub const SETPOINT_COOL_F_KEY: &str = "setpoint temp cool F";
pub const SETPOINT_HEAT_F_KEY: &str = "setpoint temp heat F";

/// Target used before any setpoint has been seen.
pub const DEFAULT_TARGET_F: f64 = 72.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    #[default]
    Off,
    Auto,
    Cool,
    Heat,
    FanOnly,
}

impl HvacMode {
    /// Air conditioner numbering, used when the mode arrives as a number or
    /// a single digit.
    pub fn from_ac_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(HvacMode::Off),
            1 => Some(HvacMode::Auto),
            2 => Some(HvacMode::Cool),
            3 => Some(HvacMode::Heat),
            4 => Some(HvacMode::FanOnly),
            _ => None,
        }
    }

    /// Thermostat numbering, used when the mode arrives as a 4-bit pattern.
    pub fn from_thermostat_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HvacMode::Off),
            1 => Some(HvacMode::Cool),
            2 => Some(HvacMode::Heat),
            3 => Some(HvacMode::Auto),
            4 => Some(HvacMode::FanOnly),
            _ => None,
        }
    }

    pub fn thermostat_code(self) -> u8 {
        match self {
            HvacMode::Off => 0,
            HvacMode::Cool => 1,
            HvacMode::Heat => 2,
            HvacMode::Auto => 3,
            HvacMode::FanOnly => 4,
        }
    }

    /// 4-bit pattern sent in thermostat commands, e.g. `"0001"` for cool.
    pub fn pattern(self) -> String {
        format!("{:04b}", self.thermostat_code())
    }

    /// Text carried in the `operating mode definition` field.
    pub fn definition(self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Auto => "auto",
            HvacMode::Cool => "cool",
            HvacMode::Heat => "heat",
            HvacMode::FanOnly => "fan only",
        }
    }

    fn from_definition(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "off" => Some(HvacMode::Off),
            "auto" | "automatic" => Some(HvacMode::Auto),
            "cool" => Some(HvacMode::Cool),
            "heat" => Some(HvacMode::Heat),
            "fan only" | "fan_only" => Some(HvacMode::FanOnly),
            _ => None,
        }
    }

    /// Parse a mode as found on the bus: JSON number, single digit,
    /// 4-bit pattern, or definition text.
    pub fn parse(value: &Value) -> Result<Self> {
        let field = OPERATING_MODE_KEYS[0];
        match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(HvacMode::from_ac_code)
                .ok_or_else(|| RvcError::unknown(field, n.to_string())),
            Value::String(s) => {
                let s = s.trim();
                if s.len() == 4 && s.bytes().all(|b| b == b'0' || b == b'1') {
                    u8::from_str_radix(s, 2)
                        .ok()
                        .and_then(HvacMode::from_thermostat_code)
                        .ok_or_else(|| RvcError::unknown(field, s))
                } else if let Ok(code) = s.parse::<i64>() {
                    HvacMode::from_ac_code(code).ok_or_else(|| RvcError::unknown(field, s))
                } else {
                    HvacMode::from_definition(s).ok_or_else(|| RvcError::unknown(field, s))
                }
            }
            other => Err(RvcError::unknown(field, other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanMode {
    #[default]
    Auto,
    Low,
    Medium,
    High,
}

impl FanMode {
    /// Bucket a 0-100 fan speed: 0 auto, below 33 low, below 66 medium, else high.
    pub fn from_speed(speed: i64) -> Self {
        let speed = clamp_reported(FAN_SPEED_KEYS[0], speed as f64, 0.0, 100.0) as i64;
        if speed == 0 {
            FanMode::Auto
        } else if speed < 33 {
            FanMode::Low
        } else if speed < 66 {
            FanMode::Medium
        } else {
            FanMode::High
        }
    }

    pub fn bucket_index(self) -> u8 {
        match self {
            FanMode::Auto => 0,
            FanMode::Low => 1,
            FanMode::Medium => 2,
            FanMode::High => 3,
        }
    }

    /// Fan speed percentage sent in commands.
    pub fn speed_percent(self) -> u8 {
        self.bucket_index() * 25
    }

    pub fn definition(self) -> &'static str {
        match self {
            FanMode::Auto => "auto",
            FanMode::Low => "low",
            FanMode::Medium => "medium",
            FanMode::High => "high",
        }
    }
}

/// Normalized thermostat state. Temperatures are Fahrenheit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermostatState {
    pub mode: HvacMode,
    pub fan_mode: FanMode,
    pub target_temperature_f: f64,
}

impl Default for ThermostatState {
    fn default() -> Self {
        Self {
            mode: HvacMode::Off,
            fan_mode: FanMode::Auto,
            target_temperature_f: DEFAULT_TARGET_F,
        }
    }
}

/// Fields of a thermostat or air conditioner status payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermostatStatus {
    pub instance: Option<u8>,
    pub mode: Option<HvacMode>,
    pub fan_mode: Option<FanMode>,
    pub setpoint_cool_f: Option<f64>,
    pub setpoint_heat_f: Option<f64>,
}

fn first_present<'a>(payload: &'a Payload, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| payload.get(*key))
}

fn setpoint(payload: &Payload, key: &str) -> Option<f64> {
    // "n/a" is how the bridge marks an unused setpoint
    payload.get(key).and_then(|v| fields::parse_float(key, v).ok())
}

impl ThermostatStatus {
    /// Unknown mode codes decode as off and unreadable fan speeds as auto;
    /// absent fields stay `None`.
    pub fn from_payload(payload: &Payload) -> Self {
        let mode = first_present(payload, &OPERATING_MODE_KEYS).map(|value| {
            HvacMode::parse(value).unwrap_or_else(|e| {
                warn!("{}, defaulting to off", e);
                HvacMode::Off
            })
        });

        let fan_mode = first_present(payload, &FAN_SPEED_KEYS).map(|value| {
            match fields::parse_integer(FAN_SPEED_KEYS[0], value) {
                Ok(speed) => FanMode::from_speed(speed),
                Err(e) => {
                    warn!("{}, defaulting fan to auto", e);
                    FanMode::Auto
                }
            }
        });

        Self {
            instance: fields::payload_instance(payload),
            mode,
            fan_mode,
            setpoint_cool_f: setpoint(payload, SETPOINT_COOL_F_KEY),
            setpoint_heat_f: setpoint(payload, SETPOINT_HEAT_F_KEY),
        }
    }

    pub fn apply(&self, previous: ThermostatState) -> ThermostatState {
        let mut state = previous;
        if let Some(mode) = self.mode {
            state.mode = mode;
        }
        if let Some(fan_mode) = self.fan_mode {
            state.fan_mode = fan_mode;
        }
        let target = if state.mode == HvacMode::Heat {
            self.setpoint_heat_f.or(self.setpoint_cool_f)
        } else {
            self.setpoint_cool_f.or(self.setpoint_heat_f)
        };
        if let Some(target) = target {
            state.target_temperature_f = target;
        }
        state
    }
}

/// Decode a thermostat or air conditioner status on top of the previous state.
pub fn decode_thermostat_status(payload: &Payload, previous: ThermostatState) -> ThermostatState {
    ThermostatStatus::from_payload(payload).apply(previous)
}

impl fmt::Display for ThermostatStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "      Thermostat:")?;
        match self.mode {
            Some(mode) => write!(f, " mode {}", mode.definition())?,
            None => write!(f, " mode N/A")?,
        }
        if let Some(fan) = self.fan_mode {
            write!(f, " | Fan: {}", fan.definition())?;
        }
        if let Some(cool) = self.setpoint_cool_f {
            write!(f, " | Cool: {:.1}°F", cool)?;
        }
        if let Some(heat) = self.setpoint_heat_f {
            write!(f, " | Heat: {:.1}°F", heat)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn decode(payload: Value) -> ThermostatState {
        decode_thermostat_status(payload.as_object().unwrap(), ThermostatState::default())
    }

    #[test]
    fn test_digit_modes() {
        assert_eq!(decode(json!({ "operating_mode": "0" })).mode, HvacMode::Off);
        assert_eq!(decode(json!({ "operating_mode": "1" })).mode, HvacMode::Auto);
        assert_eq!(decode(json!({ "operating_mode": "2" })).mode, HvacMode::Cool);
        assert_eq!(decode(json!({ "operating_mode": "3" })).mode, HvacMode::Heat);
        assert_eq!(decode(json!({ "operating mode": 4 })).mode, HvacMode::FanOnly);
    }

    #[test]
    fn test_pattern_modes() {
        assert_eq!(decode(json!({ "operating mode": "0000" })).mode, HvacMode::Off);
        assert_eq!(decode(json!({ "operating mode": "0001" })).mode, HvacMode::Cool);
        assert_eq!(decode(json!({ "operating mode": "0010" })).mode, HvacMode::Heat);
        assert_eq!(decode(json!({ "operating mode": "0011" })).mode, HvacMode::Auto);
        assert_eq!(decode(json!({ "operating mode": "0100" })).mode, HvacMode::FanOnly);
    }

    #[test]
    fn test_unknown_mode_defaults_to_off() {
        let previous = ThermostatState {
            mode: HvacMode::Cool,
            ..ThermostatState::default()
        };
        let payload = json!({ "operating mode": "1111" });
        let state = decode_thermostat_status(payload.as_object().unwrap(), previous);
        assert_eq!(state.mode, HvacMode::Off);
        assert_eq!(decode(json!({ "operating_mode": "9" })).mode, HvacMode::Off);
        assert_eq!(decode(json!({ "operating_mode": null })).mode, HvacMode::Off);
    }

    #[test]
    fn test_missing_mode_keeps_previous() {
        let previous = ThermostatState {
            mode: HvacMode::Heat,
            ..ThermostatState::default()
        };
        let payload = json!({ "fan_speed": 50 });
        let state = decode_thermostat_status(payload.as_object().unwrap(), previous);
        assert_eq!(state.mode, HvacMode::Heat);
        assert_eq!(state.fan_mode, FanMode::Medium);
    }

    #[test]
    fn test_fan_buckets() {
        assert_eq!(FanMode::from_speed(0), FanMode::Auto);
        assert_eq!(FanMode::from_speed(1), FanMode::Low);
        assert_eq!(FanMode::from_speed(32), FanMode::Low);
        assert_eq!(FanMode::from_speed(33), FanMode::Medium);
        assert_eq!(FanMode::from_speed(65), FanMode::Medium);
        assert_eq!(FanMode::from_speed(66), FanMode::High);
        assert_eq!(FanMode::from_speed(100), FanMode::High);
        assert_eq!(FanMode::from_speed(250), FanMode::High);
        assert_eq!(FanMode::from_speed(-4), FanMode::Auto);
    }

    #[test]
    fn test_fan_speed_fields() {
        assert_eq!(decode(json!({ "fan_speed": "32" })).fan_mode, FanMode::Low);
        assert_eq!(decode(json!({ "fan speed": 66 })).fan_mode, FanMode::High);
        assert_eq!(decode(json!({ "fan speed": "n/a" })).fan_mode, FanMode::Auto);
    }

    #[test]
    fn test_fan_percent() {
        assert_eq!(FanMode::Auto.speed_percent(), 0);
        assert_eq!(FanMode::Low.speed_percent(), 25);
        assert_eq!(FanMode::Medium.speed_percent(), 50);
        assert_eq!(FanMode::High.speed_percent(), 75);
    }

    #[test]
    fn test_setpoints() {
        let state = decode(json!({
            "operating mode": "0001",
            "setpoint temp cool F": 80.0,
            "setpoint temp heat F": 62
        }));
        assert_abs_diff_eq!(state.target_temperature_f, 80.0);

        let state = decode(json!({
            "operating mode": "0010",
            "setpoint temp cool F": 80.0,
            "setpoint temp heat F": 62
        }));
        assert_abs_diff_eq!(state.target_temperature_f, 62.0);

        let state = decode(json!({ "setpoint temp cool F": "n/a" }));
        assert_abs_diff_eq!(state.target_temperature_f, DEFAULT_TARGET_F);
    }

    #[test]
    fn test_mode_patterns() {
        assert_eq!(HvacMode::Cool.pattern(), "0001");
        assert_eq!(HvacMode::Auto.pattern(), "0011");
        assert_eq!(HvacMode::FanOnly.pattern(), "0100");
        for mode in [HvacMode::Off, HvacMode::Auto, HvacMode::Cool, HvacMode::Heat, HvacMode::FanOnly] {
            assert_eq!(HvacMode::parse(&json!(mode.pattern())), Ok(mode));
        }
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(serde_json::to_string(&HvacMode::FanOnly).unwrap(), "\"fan_only\"");
        let mode: HvacMode = serde_json::from_str("\"cool\"").unwrap();
        assert_eq!(mode, HvacMode::Cool);
        let fan: FanMode = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(fan, FanMode::Medium);
    }

    #[test]
    fn test_definition_text_is_accepted() {
        assert_eq!(HvacMode::parse(&json!("Cool")), Ok(HvacMode::Cool));
        assert_eq!(HvacMode::parse(&json!("fan only")), Ok(HvacMode::FanOnly));
        assert!(HvacMode::parse(&json!("dehumidify")).is_err());
    }
}
