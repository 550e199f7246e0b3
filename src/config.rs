use rvc::CommandFormat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub lights: LightsConfig,
    #[serde(default)]
    pub climate: ClimateConfig,
    #[serde(default)]
    pub water_heater: WaterHeaterConfig,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory where log files will be stored
    pub directory: String,
    /// Log file name prefix (date will be appended)
    pub file_prefix: String,
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "./logs".to_string(),
            file_prefix: "rvc_router".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub keep_alive_seconds: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "rvc_router".to_string(),
            keep_alive_seconds: 60,
        }
    }
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }
}

/// Names of the coach's dimmer loads, by instance.
pub const RVC_LIGHTS: [(u8, &str); 33] = [
    (25, "Bed Ceiling Lts A"),
    (26, "Bed Ceiling Lts B"),
    (27, "Bed Accent"),
    (28, "Bed Vanity"),
    (29, "Courtesy"),
    (30, "RR Bath Ceiling"),
    (31, "RR Bath Lav Lts"),
    (32, "RR Bath Accent"),
    (33, "Mid Bath Ceiling"),
    (34, "Mid Bath Accent"),
    (35, "Entry Ceiling"),
    (36, "Living Edge"),
    (37, "Livrm Ceiling A"),
    (38, "Livrm Ceiling B"),
    (39, "Livrm Accent A"),
    (40, "Livrm Accent B"),
    (41, "Sofa Ceiling"),
    (42, "Kitchen Ceiling"),
    (44, "D/S Slide"),
    (45, "Dinette"),
    (46, "Sink"),
    (47, "Midship"),
    (49, "Door Awning Extend"),
    (50, "Door Awning Retract"),
    (51, "Awning D/S"),
    (52, "Awning P/S"),
    (53, "Cargo"),
    (54, "Under Slide"),
    (56, "Bed Reading"),
    (57, "Security D/S"),
    (58, "Security P/S"),
    (59, "Security Motion"),
    (60, "Porch"),
];

fn default_light_names() -> BTreeMap<u8, String> {
    RVC_LIGHTS
        .iter()
        .map(|(instance, name)| (*instance, name.to_string()))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    /// Status topics are `<status_topic>/<instance>`
    pub status_topic: String,
    /// Structured commands go to `<command_topic>/<instance>`
    pub command_topic: String,
    /// Compact commands all go to this one topic
    pub direct_command_topic: String,
    pub command_format: CommandFormat,
    /// Device level (1-100) used when a light is turned on without one
    pub default_brightness: u8,
    pub delay_duration: u8,
    pub auto_discovery: bool,
    /// Update local state as soon as a command is sent
    pub optimistic: bool,
    pub names: BTreeMap<u8, String>,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            status_topic: "RVC/DC_DIMMER_STATUS_3".to_string(),
            command_topic: "RVC/DC_DIMMER_COMMAND_2".to_string(),
            direct_command_topic: "node-red/rvc/commands".to_string(),
            command_format: CommandFormat::Json,
            default_brightness: 55,
            delay_duration: rvc::dgns::dgn1fedb::DEFAULT_DELAY_DURATION,
            auto_discovery: true,
            optimistic: true,
            names: default_light_names(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub status_topics: Vec<String>,
    pub command_topic: String,
    pub min_temp_f: f64,
    pub max_temp_f: f64,
    pub default_target_f: f64,
    pub auto_discovery: bool,
    pub names: BTreeMap<u8, String>,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            status_topics: vec![
                "RVC/AIR_CONDITIONER_STATUS".to_string(),
                "RVC/THERMOSTAT_STATUS_1".to_string(),
            ],
            command_topic: "RVC/THERMOSTAT_COMMAND_1".to_string(),
            min_temp_f: 60.0,
            max_temp_f: 90.0,
            default_target_f: 72.0,
            auto_discovery: true,
            names: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterHeaterConfig {
    pub status_topic: String,
    /// Commands go to `<command_topic>/<instance>/set`
    pub command_topic: String,
    pub min_temp_f: f64,
    pub max_temp_f: f64,
    pub default_target_f: f64,
    pub auto_discovery: bool,
    pub names: BTreeMap<u8, String>,
}

impl Default for WaterHeaterConfig {
    fn default() -> Self {
        Self {
            status_topic: "RVC/WATERHEATER_STATUS".to_string(),
            command_topic: "RVC/WATERHEATER_COMMAND".to_string(),
            min_temp_f: 32.0,
            max_temp_f: 180.0,
            default_target_f: 120.0,
            auto_discovery: true,
            names: BTreeMap::new(),
        }
    }
}

fn default_payload_available() -> String {
    "online".to_string()
}

fn default_payload_not_available() -> String {
    "offline".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    /// Field to read from a JSON object payload
    #[serde(default)]
    pub value_field: Option<String>,
    #[serde(default)]
    pub unit_of_measurement: Option<String>,
    #[serde(default)]
    pub expire_after_seconds: Option<u64>,
    #[serde(default)]
    pub availability_topic: Option<String>,
    #[serde(default = "default_payload_available")]
    pub payload_available: String,
    #[serde(default = "default_payload_not_available")]
    pub payload_not_available: String,
}

impl SensorConfig {
    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

fn check_range(section: &str, min: f64, max: f64, default: f64) -> Result<(), String> {
    if min >= max {
        return Err(format!("{}: min_temp_f {} must be below max_temp_f {}", section, min, max));
    }
    if default < min || default > max {
        return Err(format!(
            "{}: default_target_f {} outside {}..={}",
            section, default, min, max
        ));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mqtt.host.trim().is_empty() {
            return Err("mqtt: host must not be empty".to_string());
        }
        if self.mqtt.port == 0 {
            return Err("mqtt: port must not be 0".to_string());
        }
        if !(1..=100).contains(&self.lights.default_brightness) {
            return Err(format!(
                "lights: default_brightness {} outside 1..=100",
                self.lights.default_brightness
            ));
        }
        if self.lights.names.contains_key(&0) {
            return Err("lights: instance 0 cannot be named".to_string());
        }
        check_range(
            "climate",
            self.climate.min_temp_f,
            self.climate.max_temp_f,
            self.climate.default_target_f,
        )?;
        check_range(
            "water_heater",
            self.water_heater.min_temp_f,
            self.water_heater.max_temp_f,
            self.water_heater.default_target_f,
        )?;

        let mut ids = HashSet::new();
        for sensor in &self.sensors {
            if sensor.state_topic.trim().is_empty() {
                return Err(format!("sensor {}: state_topic must not be empty", sensor.unique_id));
            }
            if !ids.insert(sensor.unique_id.as_str()) {
                return Err(format!("sensor {}: duplicate unique_id", sensor.unique_id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.lights.default_brightness, 55);
        assert_eq!(config.lights.delay_duration, 255);
        assert_eq!(config.lights.command_format, CommandFormat::Json);
        assert_eq!(config.lights.names.len(), 33);
        assert_eq!(config.lights.names.get(&46).map(String::as_str), Some("Sink"));
        assert_eq!(config.climate.status_topics.len(), 2);
        assert!(!config.web.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_config_default() {
        let log_config = LogConfig::default();
        assert_eq!(log_config.directory, "./logs");
        assert_eq!(log_config.file_prefix, "rvc_router");
        assert_eq!(log_config.level, "info");
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "mqtt": { "host": "coach.local", "username": "rv", "password": "secret" },
            "lights": {
                "command_format": "compact",
                "default_brightness": 70,
                "names": { "25": "Bedroom", "90": "Basement" }
            },
            "climate": { "names": { "0": "Front AC" } },
            "sensors": [
                {
                    "name": "Fresh Water",
                    "unique_id": "tank_fresh",
                    "state_topic": "RVC/TANK_STATUS/0",
                    "value_field": "relative level",
                    "expire_after_seconds": 300
                }
            ],
            "web": { "enabled": true, "port": 9000 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.mqtt.host, "coach.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.username.as_deref(), Some("rv"));
        assert_eq!(config.lights.command_format, CommandFormat::Compact);
        assert_eq!(config.lights.default_brightness, 70);
        assert_eq!(config.lights.names.len(), 2);
        assert_eq!(config.lights.names.get(&90).map(String::as_str), Some("Basement"));
        assert_eq!(config.lights.status_topic, "RVC/DC_DIMMER_STATUS_3");
        assert_eq!(config.climate.names.get(&0).map(String::as_str), Some("Front AC"));
        assert_eq!(config.sensors[0].payload_available, "online");
        assert_eq!(config.sensors[0].payload_not_available, "offline");
        assert_eq!(config.sensors[0].expire_after(), Some(Duration::from_secs(300)));
        assert!(config.web.enabled);
        assert_eq!(config.web.port, 9000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("RVC/DC_DIMMER_COMMAND_2"));
        assert!(json.contains("Porch"));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lights.names, config.lights.names);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.lights.default_brightness = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.climate.min_temp_f = 95.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.water_heater.default_target_f = 200.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.lights.names.insert(0, "Nothing".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mqtt.host = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_sensors() {
        let sensor = SensorConfig {
            name: "Grey".to_string(),
            unique_id: "tank_grey".to_string(),
            state_topic: "RVC/TANK_STATUS/2".to_string(),
            value_field: None,
            unit_of_measurement: None,
            expire_after_seconds: None,
            availability_topic: None,
            payload_available: default_payload_available(),
            payload_not_available: default_payload_not_available(),
        };
        let config = Config {
            sensors: vec![sensor.clone(), sensor],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
