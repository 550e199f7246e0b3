use chrono::{DateTime, Utc};
use rvc::scaling::clamp_reported;
use rvc::{Payload, WaterHeaterCommand, WaterHeaterState, decode_water_heater_status};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WaterHeaterConfig;

/// Body of `POST /api/water_heaters/:instance`.
#[derive(Debug, Clone, Deserialize)]
pub struct WaterHeaterRequest {
    /// Target temperature, Fahrenheit
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaterHeaterSnapshot {
    #[serde(flatten)]
    pub state: WaterHeaterState,
    pub min_temp_f: f64,
    pub max_temp_f: f64,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RvcWaterHeater {
    instance: u8,
    state: WaterHeaterState,
    min_temp_f: f64,
    max_temp_f: f64,
    last_update: Option<DateTime<Utc>>,
}

impl RvcWaterHeater {
    pub fn new(instance: u8, config: &WaterHeaterConfig) -> Self {
        Self {
            instance,
            state: WaterHeaterState {
                target_temperature_f: config.default_target_f,
                ..WaterHeaterState::default()
            },
            min_temp_f: config.min_temp_f,
            max_temp_f: config.max_temp_f,
            last_update: None,
        }
    }

    pub fn state(&self) -> WaterHeaterState {
        self.state
    }

    pub fn apply_status(&mut self, payload: &Payload) {
        self.state = decode_water_heater_status(payload, self.state);
        self.last_update = Some(Utc::now());
        debug!(
            "Water heater {} now {} at {:?}°F",
            self.instance,
            if self.state.on { "on" } else { "off" },
            self.state.current_temperature_f
        );
    }

    /// The bus never echoes the target, so it is recorded as soon as the
    /// command is built.
    pub fn set_temperature(&mut self, temperature_f: f64) -> WaterHeaterCommand {
        let target = clamp_reported("target temperature", temperature_f, self.min_temp_f, self.max_temp_f);
        let cmd = WaterHeaterCommand::new(self.instance, target);
        self.state.target_temperature_f = cmd.temperature_f;
        cmd
    }

    pub fn snapshot(&self) -> WaterHeaterSnapshot {
        WaterHeaterSnapshot {
            state: self.state,
            min_temp_f: self.min_temp_f,
            max_temp_f: self.max_temp_f,
            last_update: self.last_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    #[test]
    fn test_status_and_target() {
        let mut heater = RvcWaterHeater::new(1, &WaterHeaterConfig::default());
        assert!(!heater.state().available);
        assert_abs_diff_eq!(heater.state().target_temperature_f, 120.0);

        let payload = json!({
            "name": "WATERHEATER_STATUS",
            "water_temperature F": 110.3,
            "burner_status": "01",
            "operating_modes": "1"
        });
        heater.apply_status(payload.as_object().unwrap());
        assert!(heater.state().on);
        assert!(heater.state().available);
        assert_abs_diff_eq!(heater.state().current_temperature_f.unwrap(), 110.3);
    }

    #[test]
    fn test_set_temperature_clamps() {
        let mut heater = RvcWaterHeater::new(1, &WaterHeaterConfig::default());
        let cmd = heater.set_temperature(140.0);
        assert_abs_diff_eq!(cmd.temperature_f, 140.0);
        let cmd = heater.set_temperature(212.0);
        assert_abs_diff_eq!(cmd.temperature_f, 180.0);
        assert_abs_diff_eq!(heater.state().target_temperature_f, 180.0);
    }

    #[test]
    fn test_snapshot_is_flat() {
        let heater = RvcWaterHeater::new(2, &WaterHeaterConfig::default());
        let value = serde_json::to_value(heater.snapshot()).unwrap();
        assert_eq!(value["on"], false);
        assert_eq!(value["target_temperature_f"], 120.0);
        assert_eq!(value["max_temp_f"], 180.0);
    }
}
