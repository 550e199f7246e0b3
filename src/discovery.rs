//! Exactly-once materialization of devices seen on the bus.
//!
//! Each device class owns one [`DiscoveryRegistry`]. An instance moves from
//! unknown to materialized on its first qualifying status message (or at
//! startup when it has a configured name) and is never removed.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use rvc::Payload;
use rvc::dgns::{dgn1feda, dgn1ffe2, dgn1fff7};
use rvc::fields::message_name;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Light,
    Climate,
    WaterHeater,
}

impl DeviceClass {
    /// Message names that may create a device of this class.
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            DeviceClass::Light => &[dgn1feda::NAME],
            DeviceClass::Climate => &[dgn1ffe2::AIR_CONDITIONER_NAME, dgn1ffe2::NAME],
            DeviceClass::WaterHeater => &[dgn1fff7::NAME],
        }
    }

    pub fn qualifies(self, payload: &Payload) -> bool {
        message_name(payload).is_some_and(|name| self.markers().contains(&name))
    }

    /// Dimmer instance 0 means "no instance". Thermostats and water
    /// heaters legitimately use 0.
    pub fn accepts_instance(self, instance: u8) -> bool {
        !(self == DeviceClass::Light && instance == 0)
    }

    pub fn fallback_name(self, instance: u8) -> String {
        match self {
            DeviceClass::Light => format!("RVC Light {}", instance),
            DeviceClass::Climate => format!("HVAC {}", instance),
            DeviceClass::WaterHeater => format!("Water Heater {}", instance),
        }
    }

    pub fn unique_id(self, instance: u8) -> String {
        match self {
            DeviceClass::Light => format!("rvc_light_{}", instance),
            DeviceClass::Climate => format!("rvc_climate_{}", instance),
            DeviceClass::WaterHeater => format!("rvc_water_heater_{}", instance),
        }
    }
}

/// Where a registration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Named in configuration
    Predefined,
    /// Created from a status message
    Discovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Materialized,
    AlreadyPresent,
    /// Not a valid instance for this class
    Rejected,
    /// Message does not carry this class's marker
    Ignored,
}

#[derive(Debug)]
pub struct Registered<E> {
    pub name: String,
    pub origin: Origin,
    pub entity: E,
}

#[derive(Debug)]
pub struct DiscoveryRegistry<E> {
    class: DeviceClass,
    predefined: BTreeMap<u8, String>,
    entries: BTreeMap<u8, Registered<E>>,
}

impl<E> DiscoveryRegistry<E> {
    pub fn new(class: DeviceClass, predefined: BTreeMap<u8, String>) -> Self {
        Self {
            class,
            predefined,
            entries: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// Name an instance gets: its configured name if any, else the fallback.
    pub fn name_for(&self, instance: u8) -> String {
        self.predefined
            .get(&instance)
            .cloned()
            .unwrap_or_else(|| self.class.fallback_name(instance))
    }

    /// Register `instance` unless it already exists. `make` runs only when
    /// a new entity is created.
    ///
    /// A predefined registration for an instance that already exists takes
    /// over the name, keeping the existing entity.
    pub fn insert_if_absent(
        &mut self,
        instance: u8,
        origin: Origin,
        make: impl FnOnce() -> E,
    ) -> Registration {
        if !self.class.accepts_instance(instance) {
            debug!("Rejecting {:?} instance {}", self.class, instance);
            return Registration::Rejected;
        }

        let name = self.name_for(instance);
        match self.entries.entry(instance) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                if origin == Origin::Predefined
                    && (existing.origin == Origin::Discovered || existing.name != name)
                {
                    info!(
                        "Renaming {:?} {} from '{}' to '{}'",
                        self.class, instance, existing.name, name
                    );
                    existing.name = name;
                    existing.origin = Origin::Predefined;
                }
                Registration::AlreadyPresent
            }
            Entry::Vacant(vacant) => {
                info!("Registered {:?} {} as '{}' ({:?})", self.class, instance, name, origin);
                vacant.insert(Registered {
                    name,
                    origin,
                    entity: make(),
                });
                Registration::Materialized
            }
        }
    }

    /// Register every configured instance.
    pub fn register_predefined(&mut self, mut make: impl FnMut(u8) -> E) -> usize {
        let instances: Vec<u8> = self.predefined.keys().copied().collect();
        instances
            .into_iter()
            .filter(|&instance| {
                self.insert_if_absent(instance, Origin::Predefined, || make(instance))
                    == Registration::Materialized
            })
            .count()
    }

    /// Configure a name for `instance` after startup.
    pub fn predefine(&mut self, instance: u8, name: &str, make: impl FnOnce() -> E) -> Registration {
        if !self.class.accepts_instance(instance) {
            return Registration::Rejected;
        }
        self.predefined.insert(instance, name.to_string());
        self.insert_if_absent(instance, Origin::Predefined, make)
    }

    /// Run discovery for a status message received for `instance`.
    pub fn discover(
        &mut self,
        instance: u8,
        payload: &Payload,
        make: impl FnOnce() -> E,
    ) -> Registration {
        if !self.class.qualifies(payload) {
            return Registration::Ignored;
        }
        self.insert_if_absent(instance, Origin::Discovered, make)
    }

    pub fn get(&self, instance: u8) -> Option<&Registered<E>> {
        self.entries.get(&instance)
    }

    pub fn get_mut(&mut self, instance: u8) -> Option<&mut Registered<E>> {
        self.entries.get_mut(&instance)
    }

    pub fn contains(&self, instance: u8) -> bool {
        self.entries.contains_key(&instance)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Registered<E>)> {
        self.entries.iter().map(|(instance, entry)| (*instance, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn names(pairs: &[(u8, &str)]) -> BTreeMap<u8, String> {
        pairs.iter().map(|(i, n)| (*i, n.to_string())).collect()
    }

    fn payload(value: Value) -> Payload {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_same_status_twice_creates_one_entity() {
        let mut registry: DiscoveryRegistry<u32> = DiscoveryRegistry::new(DeviceClass::Light, BTreeMap::new());
        let status = payload(json!({ "name": "DC_DIMMER_STATUS_3", "instance": 25 }));
        let mut created = 0;

        assert_eq!(
            registry.discover(25, &status, || {
                created += 1;
                1
            }),
            Registration::Materialized
        );
        assert_eq!(
            registry.discover(25, &status, || {
                created += 1;
                2
            }),
            Registration::AlreadyPresent
        );
        assert_eq!(created, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(25).unwrap().entity, 1);
        assert_eq!(registry.get(25).unwrap().name, "RVC Light 25");
    }

    #[test]
    fn test_non_qualifying_messages_are_ignored() {
        let mut registry: DiscoveryRegistry<()> = DiscoveryRegistry::new(DeviceClass::Light, BTreeMap::new());
        let other = payload(json!({ "name": "DC_DIMMER_COMMAND_2", "instance": 25 }));
        assert_eq!(registry.discover(25, &other, || ()), Registration::Ignored);
        let nameless = payload(json!({ "instance": 25 }));
        assert_eq!(registry.discover(25, &nameless, || ()), Registration::Ignored);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_light_instance_zero_rejected() {
        let mut registry: DiscoveryRegistry<()> = DiscoveryRegistry::new(DeviceClass::Light, BTreeMap::new());
        let status = payload(json!({ "name": "DC_DIMMER_STATUS_3" }));
        assert_eq!(registry.discover(0, &status, || ()), Registration::Rejected);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_climate_accepts_instance_zero_and_both_markers() {
        let mut registry: DiscoveryRegistry<()> = DiscoveryRegistry::new(DeviceClass::Climate, BTreeMap::new());
        let ac = payload(json!({ "name": "AIR_CONDITIONER_STATUS", "instance": 0 }));
        let thermostat = payload(json!({ "name": "THERMOSTAT_STATUS_1", "instance": 1 }));
        assert_eq!(registry.discover(0, &ac, || ()), Registration::Materialized);
        assert_eq!(registry.discover(1, &thermostat, || ()), Registration::Materialized);
        assert_eq!(registry.discover(0, &thermostat, || ()), Registration::AlreadyPresent);
        assert_eq!(registry.get(0).unwrap().name, "HVAC 0");
    }

    #[test]
    fn test_predefined_name_wins() {
        let mut registry: DiscoveryRegistry<()> =
            DiscoveryRegistry::new(DeviceClass::Light, names(&[(46, "Sink")]));
        let status = payload(json!({ "name": "DC_DIMMER_STATUS_3", "instance": 46 }));
        assert_eq!(registry.discover(46, &status, || ()), Registration::Materialized);
        let entry = registry.get(46).unwrap();
        assert_eq!(entry.name, "Sink");
        assert_eq!(entry.origin, Origin::Discovered);
    }

    #[test]
    fn test_late_predefined_registration_renames() {
        let mut registry: DiscoveryRegistry<u32> =
            DiscoveryRegistry::new(DeviceClass::WaterHeater, BTreeMap::new());
        let status = payload(json!({ "name": "WATERHEATER_STATUS" }));
        registry.discover(1, &status, || 7);
        assert_eq!(registry.get(1).unwrap().name, "Water Heater 1");

        assert_eq!(registry.predefine(1, "Aqua-Hot", || 8), Registration::AlreadyPresent);
        let entry = registry.get(1).unwrap();
        assert_eq!(entry.name, "Aqua-Hot");
        assert_eq!(entry.origin, Origin::Predefined);
        assert_eq!(entry.entity, 7);
        assert_eq!(registry.len(), 1);

        // later discovery does not undo the configured name
        registry.discover(1, &status, || 9);
        assert_eq!(registry.get(1).unwrap().name, "Aqua-Hot");
        assert_eq!(registry.name_for(1), "Aqua-Hot");
    }

    #[test]
    fn test_predefine_unseen_and_invalid_instances() {
        let mut registry: DiscoveryRegistry<u32> = DiscoveryRegistry::new(DeviceClass::Light, BTreeMap::new());
        assert_eq!(registry.predefine(12, "Galley", || 1), Registration::Materialized);
        assert_eq!(registry.get(12).unwrap().origin, Origin::Predefined);
        assert_eq!(registry.predefine(12, "Galley Counter", || 2), Registration::AlreadyPresent);
        assert_eq!(registry.get(12).unwrap().name, "Galley Counter");
        assert_eq!(registry.get(12).unwrap().entity, 1);

        assert_eq!(registry.predefine(0, "Nothing", || 3), Registration::Rejected);
        assert!(!registry.contains(0));
        assert_eq!(registry.name_for(0), "RVC Light 0");
    }

    #[test]
    fn test_register_predefined() {
        let mut registry: DiscoveryRegistry<u8> =
            DiscoveryRegistry::new(DeviceClass::Light, names(&[(25, "Bed Ceiling Lts A"), (60, "Porch")]));
        assert_eq!(registry.register_predefined(|instance| instance), 2);
        assert_eq!(registry.register_predefined(|instance| instance), 0);
        let instances: Vec<u8> = registry.iter().map(|(instance, _)| instance).collect();
        assert_eq!(instances, vec![25, 60]);
        assert!(registry.contains(60));
        assert_eq!(registry.get(60).unwrap().origin, Origin::Predefined);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(DeviceClass::Light.unique_id(46), "rvc_light_46");
        assert_eq!(DeviceClass::Climate.unique_id(0), "rvc_climate_0");
        assert_eq!(DeviceClass::WaterHeater.unique_id(1), "rvc_water_heater_1");
        assert_eq!(DeviceClass::WaterHeater.fallback_name(1), "Water Heater 1");
    }
}
