use std::time::Instant;

use chrono::{DateTime, Utc};
use rvc::RvcFrame;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SensorConfig;

#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub name: String,
    pub unique_id: String,
    pub value: Option<Value>,
    pub unit_of_measurement: Option<String>,
    pub available: bool,
    pub last_update: Option<DateTime<Utc>>,
}

/// A generic MQTT sensor.
#[derive(Debug, Clone)]
pub struct RvcSensor {
    config: SensorConfig,
    value: Option<Value>,
    available: bool,
    expires_at: Option<Instant>,
    last_update: Option<DateTime<Utc>>,
}

impl RvcSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self {
            config,
            value: None,
            available: false,
            expires_at: None,
            last_update: None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn extract(&self, frame: &RvcFrame) -> Option<Value> {
        match (&self.config.value_field, &frame.payload) {
            (Some(field), Some(payload)) => {
                let value = payload.get(field).cloned();
                if value.is_none() {
                    warn!("Sensor {}: field '{}' missing from payload", self.config.unique_id, field);
                }
                value
            }
            (Some(field), None) => {
                warn!(
                    "Sensor {}: expected a JSON object with '{}', got {:?}",
                    self.config.unique_id,
                    field,
                    frame.text()
                );
                None
            }
            (None, Some(_)) => {
                warn!(
                    "Sensor {}: JSON object payload needs a value_field",
                    self.config.unique_id
                );
                None
            }
            (None, None) => match serde_json::from_slice::<Value>(&frame.data) {
                Ok(scalar) => Some(scalar),
                Err(_) => Some(Value::String(frame.text())),
            },
        }
    }

    /// Handle a publish on the state topic.
    pub fn handle_state(&mut self, frame: &RvcFrame, now: Instant) {
        let Some(value) = self.extract(frame) else {
            return;
        };
        debug!("Sensor {} = {}", self.config.unique_id, value);
        self.value = Some(value);
        self.available = true;
        self.last_update = Some(Utc::now());
        self.expires_at = self.config.expire_after().map(|after| now + after);
    }

    /// Handle a publish on the availability topic.
    pub fn handle_availability(&mut self, text: &str) {
        let text = text.trim();
        if text == self.config.payload_available {
            self.available = true;
        } else if text == self.config.payload_not_available {
            info!("Sensor {} reported unavailable", self.config.unique_id);
            self.available = false;
        } else {
            debug!("Sensor {}: ignoring availability payload {:?}", self.config.unique_id, text);
        }
    }

    /// Mark the sensor unavailable once its value is older than
    /// `expire_after_seconds`. Returns true when it just expired.
    pub fn check_expiry(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) if now >= deadline => {
                info!("Sensor {} expired", self.config.unique_id);
                self.expires_at = None;
                self.available = false;
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            name: self.config.name.clone(),
            unique_id: self.config.unique_id.clone(),
            value: self.value.clone(),
            unit_of_measurement: self.config.unit_of_measurement.clone(),
            available: self.available,
            last_update: self.last_update,
        }
    }
}

/// All configured sensors, routed by topic.
#[derive(Debug, Default)]
pub struct SensorSet {
    sensors: Vec<RvcSensor>,
}

impl SensorSet {
    pub fn new(configs: &[SensorConfig]) -> Self {
        Self {
            sensors: configs.iter().cloned().map(RvcSensor::new).collect(),
        }
    }

    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .sensors
            .iter()
            .flat_map(|s| std::iter::once(s.config.state_topic.clone()).chain(s.config.availability_topic.clone()))
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Route a frame to every sensor listening on its topic. Returns true
    /// if any sensor consumed it.
    pub fn handle_frame(&mut self, frame: &RvcFrame, now: Instant) -> bool {
        let mut matched = false;
        for sensor in &mut self.sensors {
            if sensor.config.state_topic == frame.topic {
                sensor.handle_state(frame, now);
                matched = true;
            }
            if sensor.config.availability_topic.as_deref() == Some(frame.topic.as_str()) {
                sensor.handle_availability(&frame.text());
                matched = true;
            }
        }
        matched
    }

    /// Returns the number of sensors that expired.
    pub fn expire(&mut self, now: Instant) -> usize {
        self.sensors
            .iter_mut()
            .map(|s| s.check_expiry(now))
            .filter(|expired| *expired)
            .count()
    }

    pub fn get(&self, unique_id: &str) -> Option<&RvcSensor> {
        self.sensors.iter().find(|s| s.config.unique_id == unique_id)
    }

    pub fn snapshots(&self) -> Vec<SensorSnapshot> {
        self.sensors.iter().map(RvcSensor::snapshot).collect()
    }
}
