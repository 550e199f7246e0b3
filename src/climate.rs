use chrono::{DateTime, Utc};
use rvc::scaling::clamp_reported;
use rvc::{FanMode, HvacMode, Payload, ThermostatCommand, ThermostatState};
use rvc::{decode_thermostat_status, encode_thermostat_command};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClimateConfig;

/// Body of `POST /api/climate/:instance`. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClimateRequest {
    #[serde(default)]
    pub mode: Option<HvacMode>,
    #[serde(default)]
    pub fan_mode: Option<FanMode>,
    /// Target temperature, Fahrenheit
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClimateSnapshot {
    pub mode: HvacMode,
    pub fan_mode: FanMode,
    pub target_temperature_f: f64,
    pub min_temp_f: f64,
    pub max_temp_f: f64,
    pub last_update: Option<DateTime<Utc>>,
}

/// A thermostat zone or air conditioner.
#[derive(Debug, Clone)]
pub struct RvcClimate {
    instance: u8,
    state: ThermostatState,
    min_temp_f: f64,
    max_temp_f: f64,
    last_update: Option<DateTime<Utc>>,
}

impl RvcClimate {
    pub fn new(instance: u8, config: &ClimateConfig) -> Self {
        Self {
            instance,
            state: ThermostatState {
                target_temperature_f: config.default_target_f,
                ..ThermostatState::default()
            },
            min_temp_f: config.min_temp_f,
            max_temp_f: config.max_temp_f,
            last_update: None,
        }
    }

    pub fn state(&self) -> ThermostatState {
        self.state
    }

    pub fn apply_status(&mut self, payload: &Payload) {
        self.state = decode_thermostat_status(payload, self.state);
        self.last_update = Some(Utc::now());
        debug!(
            "Climate {} now {:?}, fan {:?}, target {:.1}°F",
            self.instance, self.state.mode, self.state.fan_mode, self.state.target_temperature_f
        );
    }

    /// Merge a request into the current state and build the command for it.
    /// The requested temperature is clamped into the configured range.
    pub fn set(&mut self, request: &ClimateRequest) -> ThermostatCommand {
        let mut target = self.state;
        if let Some(mode) = request.mode {
            target.mode = mode;
        }
        if let Some(fan_mode) = request.fan_mode {
            target.fan_mode = fan_mode;
        }
        if let Some(temperature) = request.temperature {
            target.target_temperature_f =
                clamp_reported("target temperature", temperature, self.min_temp_f, self.max_temp_f);
        }
        self.state = target;
        encode_thermostat_command(self.instance, &target)
    }

    pub fn snapshot(&self) -> ClimateSnapshot {
        ClimateSnapshot {
            mode: self.state.mode,
            fan_mode: self.state.fan_mode,
            target_temperature_f: self.state.target_temperature_f,
            min_temp_f: self.min_temp_f,
            max_temp_f: self.max_temp_f,
            last_update: self.last_update,
        }
    }
}
