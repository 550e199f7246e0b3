use std::fmt;

use serde_json::{Value, json};

use super::dgn1ffe2::{FanMode, HvacMode, ThermostatState};
use crate::fields::{self, Payload};
use crate::scaling::{fahrenheit_to_celsius, round_tenths};

pub const DGN: u32 = 0x1FEF9;
pub const NAME: &str = "THERMOSTAT_COMMAND_1";

const FAN_MODE_AUTO: &str = "00";
const FAN_MODE_ON: &str = "01";
const SCHEDULE_MODE_DISABLED: &str = "00";

/// Thermostat command. Setpoints are sent for both cool and heat, each in
/// Celsius with the Fahrenheit value alongside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermostatCommand {
    pub instance: u8,
    pub mode: HvacMode,
    pub fan_mode: FanMode,
    pub setpoint_f: f64,
    pub setpoint_c: f64,
}

impl ThermostatCommand {
    pub fn fan_mode_code(&self) -> &'static str {
        match self.fan_mode {
            FanMode::Auto => FAN_MODE_AUTO,
            _ => FAN_MODE_ON,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Payload::new();
        map.insert(fields::NAME_KEY.into(), json!(NAME));
        map.insert("dgn".into(), json!(format!("{:X}", DGN)));
        map.insert(fields::INSTANCE_KEY.into(), json!(self.instance));
        map.insert("operating mode".into(), json!(self.mode.pattern()));
        map.insert("operating mode definition".into(), json!(self.mode.definition()));
        map.insert("fan mode".into(), json!(self.fan_mode_code()));
        map.insert(
            "fan mode definition".into(),
            json!(if self.fan_mode == FanMode::Auto { "auto" } else { "on" }),
        );
        map.insert("fan speed".into(), json!(self.fan_mode.speed_percent()));
        map.insert("schedule mode".into(), json!(SCHEDULE_MODE_DISABLED));
        map.insert("schedule mode definition".into(), json!("disabled"));
        map.insert("setpoint temp cool".into(), json!(self.setpoint_c));
        map.insert("setpoint temp cool F".into(), json!(self.setpoint_f));
        map.insert("setpoint temp heat".into(), json!(self.setpoint_c));
        map.insert("setpoint temp heat F".into(), json!(self.setpoint_f));
        Value::Object(map)
    }

    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}

/// Build the command that drives a thermostat to `target`.
pub fn encode_thermostat_command(instance: u8, target: &ThermostatState) -> ThermostatCommand {
    ThermostatCommand {
        instance,
        mode: target.mode,
        fan_mode: target.fan_mode,
        setpoint_f: round_tenths(target.target_temperature_f),
        setpoint_c: fahrenheit_to_celsius(target.target_temperature_f),
    }
}

impl fmt::Display for ThermostatCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "      Thermostat {} command: {} | Fan: {} | Setpoint: {:.1}°F ({:.1}°C)",
            self.instance,
            self.mode.definition(),
            self.fan_mode.definition(),
            self.setpoint_f,
            self.setpoint_c
        )
    }
}
