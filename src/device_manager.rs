use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rvc::topic::{instance_from_topic, instance_topic, wildcard_topic};
use rvc::{MessageHandler, Payload, RvcFrame};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::climate::{ClimateRequest, ClimateSnapshot, RvcClimate};
use crate::command_sink::{CommandSink, PublishError};
use crate::config::{ClimateConfig, Config, LightsConfig, WaterHeaterConfig};
use crate::discovery::{DeviceClass, DiscoveryRegistry, Origin, Registration};
use crate::light::{LightAction, LightRequest, LightSnapshot, RvcLight, command_publication};
use crate::sensor::{SensorSet, SensorSnapshot};
use crate::water_heater::{RvcWaterHeater, WaterHeaterRequest, WaterHeaterSnapshot};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no {class:?} with instance {instance}")]
    NotFound { class: DeviceClass, instance: u8 },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Counters collected between two metrics reports.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HandlerStats {
    pub status_updates: u64,
    pub discoveries: u64,
    pub commands_published: u64,
    pub malformed_payloads: u64,
    pub sensor_updates: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DeviceState {
    Light(LightSnapshot),
    Climate(ClimateSnapshot),
    WaterHeater(WaterHeaterSnapshot),
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub class: DeviceClass,
    pub instance: u8,
    pub name: String,
    pub unique_id: String,
    pub origin: Origin,
    pub state: DeviceState,
}

/// Shared between the MQTT loop and the web server.
pub type SharedManager = Arc<Mutex<DeviceManager>>;

/// Lock the manager, recovering it if another thread panicked while
/// holding the lock.
pub fn lock_manager(manager: &Mutex<DeviceManager>) -> MutexGuard<'_, DeviceManager> {
    manager.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns every device and routes bus traffic to them.
pub struct DeviceManager {
    lights_config: LightsConfig,
    climate_config: ClimateConfig,
    water_heater_config: WaterHeaterConfig,
    lights: DiscoveryRegistry<RvcLight>,
    climate: DiscoveryRegistry<RvcClimate>,
    water_heaters: DiscoveryRegistry<RvcWaterHeater>,
    sensors: SensorSet,
    sink: Box<dyn CommandSink>,
    stats: HandlerStats,
}

/// Discover (when enabled) and apply a status to the entity for `instance`.
fn route_status<E>(
    registry: &mut DiscoveryRegistry<E>,
    auto_discovery: bool,
    instance: u8,
    payload: &Payload,
    stats: &mut HandlerStats,
    make: impl FnOnce() -> E,
    apply: impl FnOnce(&mut E, &Payload),
) {
    if auto_discovery && registry.discover(instance, payload, make) == Registration::Materialized {
        stats.discoveries += 1;
    }
    match registry.get_mut(instance) {
        Some(entry) => {
            apply(&mut entry.entity, payload);
            stats.status_updates += 1;
        }
        None => debug!("No {:?} for instance {}, status dropped", registry.class(), instance),
    }
}

impl DeviceManager {
    pub fn new(config: &Config, sink: Box<dyn CommandSink>) -> Self {
        let mut lights = DiscoveryRegistry::new(DeviceClass::Light, config.lights.names.clone());
        let mut climate = DiscoveryRegistry::new(DeviceClass::Climate, config.climate.names.clone());
        let mut water_heaters =
            DiscoveryRegistry::new(DeviceClass::WaterHeater, config.water_heater.names.clone());

        let count = lights.register_predefined(|instance| RvcLight::new(instance, &config.lights))
            + climate.register_predefined(|instance| RvcClimate::new(instance, &config.climate))
            + water_heaters.register_predefined(|instance| RvcWaterHeater::new(instance, &config.water_heater));
        info!("Registered {} predefined devices", count);

        Self {
            lights_config: config.lights.clone(),
            climate_config: config.climate.clone(),
            water_heater_config: config.water_heater.clone(),
            lights,
            climate,
            water_heaters,
            sensors: SensorSet::new(&config.sensors),
            sink,
            stats: HandlerStats::default(),
        }
    }

    /// Every topic the manager needs to hear.
    pub fn subscription_topics(&self) -> Vec<String> {
        let mut topics = vec![wildcard_topic(&self.lights_config.status_topic)];
        topics.extend(self.climate_config.status_topics.iter().map(|t| wildcard_topic(t)));
        topics.push(wildcard_topic(&self.water_heater_config.status_topic));
        topics.extend(self.sensors.topics());
        topics
    }

    fn handle_status(&mut self, frame: &RvcFrame) {
        let topic = frame.topic.as_str();
        let light = instance_from_topic(topic, &self.lights_config.status_topic);
        let climate = self
            .climate_config
            .status_topics
            .iter()
            .find_map(|prefix| instance_from_topic(topic, prefix));
        let water_heater = instance_from_topic(topic, &self.water_heater_config.status_topic);

        if light.is_none() && climate.is_none() && water_heater.is_none() {
            return;
        }
        let Some(payload) = &frame.payload else {
            warn!("Non-JSON status on {}: {:?}", topic, frame.text());
            self.stats.malformed_payloads += 1;
            return;
        };

        if let Some(instance) = light {
            let config = &self.lights_config;
            route_status(
                &mut self.lights,
                config.auto_discovery,
                instance,
                payload,
                &mut self.stats,
                || RvcLight::new(instance, config),
                RvcLight::apply_status,
            );
        } else if let Some(instance) = climate {
            let config = &self.climate_config;
            route_status(
                &mut self.climate,
                config.auto_discovery,
                instance,
                payload,
                &mut self.stats,
                || RvcClimate::new(instance, config),
                RvcClimate::apply_status,
            );
        } else if let Some(instance) = water_heater {
            let config = &self.water_heater_config;
            route_status(
                &mut self.water_heaters,
                config.auto_discovery,
                instance,
                payload,
                &mut self.stats,
                || RvcWaterHeater::new(instance, config),
                RvcWaterHeater::apply_status,
            );
        }
    }

    fn publish(&mut self, topic: String, payload: String) -> Result<(), DeviceError> {
        debug!("Publishing to {}: {}", topic, payload);
        match self.sink.publish(&topic, payload) {
            Ok(()) => {
                self.stats.commands_published += 1;
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                Err(e.into())
            }
        }
    }

    /// Commands are built on a copy of the device. The copy replaces the
    /// stored device only once the publish is accepted, so a failed publish
    /// leaves the state untouched.
    pub fn light_command(&mut self, instance: u8, request: &LightRequest) -> Result<LightSnapshot, DeviceError> {
        let entry = self.lights.get(instance).ok_or(DeviceError::NotFound {
            class: DeviceClass::Light,
            instance,
        })?;
        let mut light = entry.entity.clone();

        let mut cmd = match request.action {
            LightAction::TurnOn => light.turn_on(request.brightness),
            LightAction::TurnOff => light.turn_off(),
            LightAction::Toggle => light.toggle(),
            LightAction::RampUp => light.ramp(true, request.level),
            LightAction::RampDown => light.ramp(false, request.level),
            LightAction::StopRamp => light.stop_ramp(),
            LightAction::SendCommand => {
                let code = request
                    .command
                    .ok_or_else(|| DeviceError::InvalidRequest("send_command needs a command code".to_string()))?;
                light.send_command(code, request.level)
            }
        };
        if let Some(delay) = request.delay_duration {
            cmd = cmd.with_delay_duration(delay);
        }

        info!("Light '{}': {}", entry.name, cmd);
        let (topic, payload) = command_publication(&self.lights_config, &cmd);
        self.publish(topic, payload)?;

        let snapshot = light.snapshot();
        if let Some(entry) = self.lights.get_mut(instance) {
            entry.entity = light;
        }
        Ok(snapshot)
    }

    pub fn climate_command(
        &mut self,
        instance: u8,
        request: &ClimateRequest,
    ) -> Result<ClimateSnapshot, DeviceError> {
        if request.temperature.is_some_and(|t| !t.is_finite()) {
            return Err(DeviceError::InvalidRequest("temperature must be a number".to_string()));
        }
        let entry = self.climate.get(instance).ok_or(DeviceError::NotFound {
            class: DeviceClass::Climate,
            instance,
        })?;
        let mut climate = entry.entity.clone();
        let cmd = climate.set(request);

        info!("Climate '{}': {}", entry.name, cmd);
        let topic = instance_topic(&self.climate_config.command_topic, instance);
        self.publish(topic, cmd.encode())?;

        let snapshot = climate.snapshot();
        if let Some(entry) = self.climate.get_mut(instance) {
            entry.entity = climate;
        }
        Ok(snapshot)
    }

    pub fn water_heater_command(
        &mut self,
        instance: u8,
        request: &WaterHeaterRequest,
    ) -> Result<WaterHeaterSnapshot, DeviceError> {
        if !request.temperature.is_finite() {
            return Err(DeviceError::InvalidRequest("temperature must be a number".to_string()));
        }
        let entry = self.water_heaters.get(instance).ok_or(DeviceError::NotFound {
            class: DeviceClass::WaterHeater,
            instance,
        })?;
        let mut heater = entry.entity.clone();
        let cmd = heater.set_temperature(request.temperature);

        info!("Water heater '{}': {}", entry.name, cmd);
        let topic = format!(
            "{}/set",
            instance_topic(&self.water_heater_config.command_topic, instance)
        );
        self.publish(topic, cmd.encode())?;

        let snapshot = heater.snapshot();
        if let Some(entry) = self.water_heaters.get_mut(instance) {
            entry.entity = heater;
        }
        Ok(snapshot)
    }

    /// Give a device a configured name at runtime. A discovered device is
    /// renamed in place; an unseen instance is created under that name.
    pub fn name_device(
        &mut self,
        class: DeviceClass,
        instance: u8,
        name: &str,
    ) -> Result<DeviceSnapshot, DeviceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DeviceError::InvalidRequest("name must not be empty".to_string()));
        }
        let registration = match class {
            DeviceClass::Light => {
                let config = &self.lights_config;
                self.lights.predefine(instance, name, || RvcLight::new(instance, config))
            }
            DeviceClass::Climate => {
                let config = &self.climate_config;
                self.climate.predefine(instance, name, || RvcClimate::new(instance, config))
            }
            DeviceClass::WaterHeater => {
                let config = &self.water_heater_config;
                self.water_heaters
                    .predefine(instance, name, || RvcWaterHeater::new(instance, config))
            }
        };
        if registration == Registration::Rejected {
            return Err(DeviceError::InvalidRequest(format!(
                "{:?} instance {} is not valid",
                class, instance
            )));
        }
        self.devices()
            .into_iter()
            .find(|d| d.class == class && d.instance == instance)
            .ok_or(DeviceError::NotFound { class, instance })
    }

    pub fn devices(&self) -> Vec<DeviceSnapshot> {
        let lights = self.lights.iter().map(|(instance, entry)| DeviceSnapshot {
            class: DeviceClass::Light,
            instance,
            name: entry.name.clone(),
            unique_id: DeviceClass::Light.unique_id(instance),
            origin: entry.origin,
            state: DeviceState::Light(entry.entity.snapshot()),
        });
        let climate = self.climate.iter().map(|(instance, entry)| DeviceSnapshot {
            class: DeviceClass::Climate,
            instance,
            name: entry.name.clone(),
            unique_id: DeviceClass::Climate.unique_id(instance),
            origin: entry.origin,
            state: DeviceState::Climate(entry.entity.snapshot()),
        });
        let water_heaters = self.water_heaters.iter().map(|(instance, entry)| DeviceSnapshot {
            class: DeviceClass::WaterHeater,
            instance,
            name: entry.name.clone(),
            unique_id: DeviceClass::WaterHeater.unique_id(instance),
            origin: entry.origin,
            state: DeviceState::WaterHeater(entry.entity.snapshot()),
        });
        lights.chain(climate).chain(water_heaters).collect()
    }

    pub fn sensors(&self) -> Vec<SensorSnapshot> {
        self.sensors.snapshots()
    }

    pub fn expire_sensors(&mut self, now: Instant) -> usize {
        self.sensors.expire(now)
    }

    /// Return the counters gathered since the last call and reset them.
    pub fn take_stats(&mut self) -> HandlerStats {
        std::mem::take(&mut self.stats)
    }
}

impl MessageHandler for DeviceManager {
    fn handle_message(&mut self, frame: &RvcFrame) {
        if self.sensors.handle_frame(frame, Instant::now()) {
            self.stats.sensor_updates += 1;
        }
        self.handle_status(frame);
    }
}
