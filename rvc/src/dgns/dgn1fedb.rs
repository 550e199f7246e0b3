use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Result, RvcError};
use crate::fields::{self, Payload};
use crate::scaling::{clamp_on_brightness, ui_to_device};

pub const DGN: u32 = 0x1FEDB;
pub const NAME: &str = "DC_DIMMER_COMMAND_2";

/// Delay/duration value meaning "no delay, no timeout".
pub const DEFAULT_DELAY_DURATION: u8 = 255;
/// Level used by toggle and ramp commands when none is given.
pub const FULL_LEVEL: u8 = 100;

pub const COMMAND_KEY: &str = "command";
pub const COMMAND_DEFINITION_KEY: &str = "command definition";
pub const DESIRED_LEVEL_KEY: &str = "desired level";
pub const DELAY_DURATION_KEY: &str = "delay/duration";

/// DC dimmer command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    Stop,
    On,
    Off,
    Toggle,
    RampUp,
    RampDown,
    /// Any other code; dimmers support more than the named ones.
    Other(u8),
}

impl CommandCode {
    pub fn code(self) -> u8 {
        match self {
            CommandCode::Stop => 0,
            CommandCode::On => 2,
            CommandCode::Off => 3,
            CommandCode::Toggle => 5,
            CommandCode::RampUp => 19,
            CommandCode::RampDown => 20,
            CommandCode::Other(code) => code,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => CommandCode::Stop,
            2 => CommandCode::On,
            3 => CommandCode::Off,
            5 => CommandCode::Toggle,
            19 => CommandCode::RampUp,
            20 => CommandCode::RampDown,
            other => CommandCode::Other(other),
        }
    }

    /// Text carried in the `command definition` field.
    pub fn definition(self) -> &'static str {
        match self {
            CommandCode::Stop => "stop",
            CommandCode::On => "on",
            CommandCode::Off => "off",
            CommandCode::Toggle => "toggle",
            CommandCode::RampUp => "ramp up",
            CommandCode::RampDown => "ramp down",
            CommandCode::Other(_) => "custom",
        }
    }
}

/// Wire format used for outbound dimmer commands.
///
/// The structured form goes to the per-instance command topic; the compact
/// `"<instance> <command> <level>"` form goes to a single direct command
/// topic served by the bridge. Both carry the same command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandFormat {
    #[default]
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimmerCommand {
    pub instance: u8,
    pub command: CommandCode,
    /// Device level 0-100.
    pub desired_level: u8,
    pub delay_duration: u8,
}

impl DimmerCommand {
    pub fn new(instance: u8, command: CommandCode, desired_level: u8) -> Self {
        Self {
            instance,
            command,
            desired_level,
            delay_duration: DEFAULT_DELAY_DURATION,
        }
    }

    pub fn with_delay_duration(mut self, delay_duration: u8) -> Self {
        self.delay_duration = delay_duration;
        self
    }

    /// Render the command in the selected wire format.
    pub fn encode(&self, format: CommandFormat) -> String {
        match format {
            CommandFormat::Json => self.to_json().to_string(),
            CommandFormat::Compact => format!(
                "{} {} {}",
                self.instance,
                self.command.code(),
                self.desired_level
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Payload::new();
        map.insert(COMMAND_KEY.into(), json!(self.command.code()));
        map.insert(COMMAND_DEFINITION_KEY.into(), json!(self.command.definition()));
        map.insert(fields::INSTANCE_KEY.into(), json!(self.instance));
        map.insert(DESIRED_LEVEL_KEY.into(), json!(self.desired_level));
        map.insert(DELAY_DURATION_KEY.into(), json!(self.delay_duration));
        Value::Object(map)
    }

    /// Parse `"<instance> <command> <level>"`.
    pub fn parse_compact(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        let [instance, command, level] = parts.as_slice() else {
            return Err(RvcError::InvalidCommand(format!(
                "expected 3 fields, got {:?}",
                text
            )));
        };
        let number = |name: &str, s: &str| {
            s.parse::<u8>()
                .map_err(|_| RvcError::InvalidCommand(format!("{} {:?} is not 0-255", name, s)))
        };
        Ok(Self::new(
            number("instance", *instance)?,
            CommandCode::from_code(number("command", *command)?),
            number("level", *level)?,
        ))
    }

    /// Parse the structured JSON command object.
    pub fn from_json(payload: &Payload) -> Result<Self> {
        let byte = |key: &str, default: Option<u8>| -> Result<u8> {
            match payload.get(key) {
                Some(value) => {
                    let raw = fields::parse_integer(key, value)?;
                    u8::try_from(raw).map_err(|_| RvcError::malformed(key, raw))
                }
                None => default.ok_or_else(|| RvcError::MalformedPayload(format!("missing {}", key))),
            }
        };
        Ok(Self {
            instance: byte(fields::INSTANCE_KEY, None)?,
            command: CommandCode::from_code(byte(COMMAND_KEY, None)?),
            desired_level: byte(DESIRED_LEVEL_KEY, Some(0))?,
            delay_duration: byte(DELAY_DURATION_KEY, Some(DEFAULT_DELAY_DURATION))?,
        })
    }
}

/// Build a dimmer command from a UI-scale (0-255) target.
///
/// `On` converts to device scale and never goes below 1; with no target it
/// uses `default_brightness`. `Off` and `Stop` carry level 0. Toggle and
/// ramps carry the converted target, or full level without one.
pub fn encode_brightness_command(
    instance: u8,
    target_brightness_ui: Option<u8>,
    command: CommandCode,
    default_brightness: u8,
) -> DimmerCommand {
    let level = match command {
        CommandCode::On => match target_brightness_ui {
            Some(ui) => clamp_on_brightness(ui_to_device(ui) as i64),
            None => clamp_on_brightness(default_brightness as i64),
        },
        CommandCode::Off | CommandCode::Stop => 0,
        CommandCode::Toggle | CommandCode::RampUp | CommandCode::RampDown => {
            target_brightness_ui.map(ui_to_device).unwrap_or(FULL_LEVEL)
        }
        CommandCode::Other(_) => target_brightness_ui.map(ui_to_device).unwrap_or(0),
    };
    DimmerCommand::new(instance, command, level)
}

impl fmt::Display for DimmerCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "      Dimmer {} command: {} ({}) level {}%",
            self.instance,
            self.command.definition(),
            self.command.code(),
            self.desired_level
        )
    }
}
