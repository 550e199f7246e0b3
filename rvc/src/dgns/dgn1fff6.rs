use std::fmt;

use serde_json::{Value, json};

use crate::scaling::round_tenths;

pub const DGN: u32 = 0x1FFF6;
pub const NAME: &str = "WATERHEATER_COMMAND";

/// Water heater target temperature command, Fahrenheit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterHeaterCommand {
    pub instance: u8,
    pub temperature_f: f64,
}

impl WaterHeaterCommand {
    pub fn new(instance: u8, temperature_f: f64) -> Self {
        Self {
            instance,
            temperature_f: round_tenths(temperature_f),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "temperature": self.temperature_f })
    }

    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}

impl fmt::Display for WaterHeaterCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "      Water heater {} command: {:.1}°F",
            self.instance, self.temperature_f
        )
    }
}
