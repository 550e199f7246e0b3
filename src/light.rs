use chrono::{DateTime, Utc};
use rvc::scaling::{clamp_brightness, clamp_on_brightness, device_to_ui};
use rvc::{CommandCode, CommandFormat, DimmerCommand, DimmerState, Payload};
use rvc::{decode_brightness_payload, encode_brightness_command, topic};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LightsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightAction {
    #[serde(alias = "on")]
    TurnOn,
    #[serde(alias = "off")]
    TurnOff,
    Toggle,
    RampUp,
    RampDown,
    StopRamp,
    SendCommand,
}

/// Body of `POST /api/lights/:instance`.
///
/// `brightness` is UI scale (0-255) and only used by `turn_on`; `level` is
/// a device level (0-100) for ramps and raw commands.
#[derive(Debug, Clone, Deserialize)]
pub struct LightRequest {
    pub action: LightAction,
    #[serde(default)]
    pub brightness: Option<u8>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub command: Option<u8>,
    #[serde(default)]
    pub delay_duration: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LightSnapshot {
    pub on: bool,
    /// Device level, 0-100
    pub brightness: u8,
    /// UI level, 0-255
    pub brightness_ui: u8,
    pub last_update: Option<DateTime<Utc>>,
}

/// A dimmer load.
#[derive(Debug, Clone)]
pub struct RvcLight {
    instance: u8,
    state: DimmerState,
    default_brightness: u8,
    delay_duration: u8,
    optimistic: bool,
    last_update: Option<DateTime<Utc>>,
}

impl RvcLight {
    pub fn new(instance: u8, config: &LightsConfig) -> Self {
        Self {
            instance,
            state: DimmerState::default(),
            default_brightness: clamp_on_brightness(config.default_brightness as i64),
            delay_duration: config.delay_duration,
            optimistic: config.optimistic,
            last_update: None,
        }
    }

    pub fn state(&self) -> DimmerState {
        self.state
    }

    pub fn apply_status(&mut self, payload: &Payload) {
        self.state = decode_brightness_payload(payload, self.state, self.default_brightness);
        self.last_update = Some(Utc::now());
        debug!(
            "Light {} now {} at {}%",
            self.instance,
            if self.state.on { "on" } else { "off" },
            self.state.brightness
        );
    }

    pub fn snapshot(&self) -> LightSnapshot {
        LightSnapshot {
            on: self.state.on,
            brightness: self.state.brightness,
            brightness_ui: device_to_ui(self.state.brightness),
            last_update: self.last_update,
        }
    }

    fn command(&self, command: CommandCode, brightness_ui: Option<u8>) -> DimmerCommand {
        encode_brightness_command(self.instance, brightness_ui, command, self.default_brightness)
            .with_delay_duration(self.delay_duration)
    }

    /// Turn on at a UI brightness, or at the default level.
    pub fn turn_on(&mut self, brightness_ui: Option<u8>) -> DimmerCommand {
        let cmd = self.command(CommandCode::On, brightness_ui);
        if self.optimistic {
            self.state = DimmerState {
                on: true,
                brightness: cmd.desired_level,
            };
        }
        cmd
    }

    pub fn turn_off(&mut self) -> DimmerCommand {
        let cmd = self.command(CommandCode::Off, None);
        if self.optimistic {
            self.state = DimmerState::default();
        }
        cmd
    }

    pub fn toggle(&mut self) -> DimmerCommand {
        let cmd = self.command(CommandCode::Toggle, None);
        if self.optimistic {
            self.state.on = !self.state.on;
            if self.state.on && self.state.brightness == 0 {
                self.state.brightness = self.default_brightness;
            }
        }
        cmd
    }

    /// Ramp toward a device level (1-100), full level when none is given.
    pub fn ramp(&self, up: bool, level: Option<u8>) -> DimmerCommand {
        let command = if up { CommandCode::RampUp } else { CommandCode::RampDown };
        let mut cmd = self.command(command, None);
        if let Some(level) = level {
            cmd.desired_level = clamp_on_brightness(level as i64);
        }
        cmd
    }

    pub fn stop_ramp(&self) -> DimmerCommand {
        self.command(CommandCode::Stop, None)
    }

    /// Arbitrary command code with an optional device level.
    pub fn send_command(&self, code: u8, level: Option<u8>) -> DimmerCommand {
        DimmerCommand::new(
            self.instance,
            CommandCode::from_code(code),
            level.map(|l| clamp_brightness(l as i64)).unwrap_or(0),
        )
        .with_delay_duration(self.delay_duration)
    }
}

/// Topic and payload for a dimmer command in the configured format.
pub fn command_publication(config: &LightsConfig, cmd: &DimmerCommand) -> (String, String) {
    let topic = match config.command_format {
        CommandFormat::Json => topic::instance_topic(&config.command_topic, cmd.instance),
        CommandFormat::Compact => config.direct_command_topic.clone(),
    };
    (topic, cmd.encode(config.command_format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn light(optimistic: bool) -> RvcLight {
        let config = LightsConfig {
            optimistic,
            ..LightsConfig::default()
        };
        RvcLight::new(46, &config)
    }

    #[test]
    fn test_apply_status() {
        let mut light = light(true);
        let payload = json!({ "name": "DC_DIMMER_STATUS_3", "operating status (brightness)": 100 });
        light.apply_status(payload.as_object().unwrap());
        let snapshot = light.snapshot();
        assert!(snapshot.on);
        assert_eq!(snapshot.brightness, 100);
        assert_eq!(snapshot.brightness_ui, 255);
        assert!(snapshot.last_update.is_some());
    }

    #[test]
    fn test_turn_on_optimistic() {
        let mut light = light(true);
        let cmd = light.turn_on(Some(128));
        assert_eq!(cmd.command, CommandCode::On);
        assert_eq!(cmd.desired_level, 50);
        assert_eq!(light.state(), DimmerState { on: true, brightness: 50 });

        let cmd = light.turn_on(None);
        assert_eq!(cmd.desired_level, 55);
    }

    #[test]
    fn test_turn_off_clears_level() {
        let mut light = light(true);
        light.turn_on(Some(255));
        let cmd = light.turn_off();
        assert_eq!(cmd.command, CommandCode::Off);
        assert_eq!(cmd.desired_level, 0);
        assert_eq!(light.state(), DimmerState { on: false, brightness: 0 });
        let snapshot = light.snapshot();
        assert_eq!(snapshot.brightness_ui, 0);

        // toggling back on falls back to the default level
        light.toggle();
        assert_eq!(light.state(), DimmerState { on: true, brightness: 55 });
    }

    #[test]
    fn test_not_optimistic_waits_for_status() {
        let mut light = light(false);
        light.turn_on(Some(255));
        assert_eq!(light.state(), DimmerState::default());
        light.toggle();
        assert_eq!(light.state(), DimmerState::default());
    }

    #[test]
    fn test_toggle() {
        let mut light = light(true);
        let cmd = light.toggle();
        assert_eq!(cmd.command, CommandCode::Toggle);
        assert_eq!(cmd.desired_level, 100);
        assert_eq!(light.state(), DimmerState { on: true, brightness: 55 });
        light.toggle();
        assert!(!light.state().on);
    }

    #[test]
    fn test_ramps_and_raw_commands() {
        let light = light(true);
        assert_eq!(light.ramp(true, None).desired_level, 100);
        assert_eq!(light.ramp(false, Some(30)).command, CommandCode::RampDown);
        assert_eq!(light.ramp(false, Some(0)).desired_level, 1);
        assert_eq!(light.stop_ramp().command, CommandCode::Stop);

        let cmd = light.send_command(21, Some(150));
        assert_eq!(cmd.command, CommandCode::Other(21));
        assert_eq!(cmd.desired_level, 100);
        assert_eq!(cmd.delay_duration, 255);
    }

    #[test]
    fn test_command_publication() {
        let mut config = LightsConfig::default();
        let cmd = DimmerCommand::new(46, CommandCode::On, 80);

        let (topic, payload) = command_publication(&config, &cmd);
        assert_eq!(topic, "RVC/DC_DIMMER_COMMAND_2/46");
        assert!(payload.starts_with('{'));

        config.command_format = CommandFormat::Compact;
        let (topic, payload) = command_publication(&config, &cmd);
        assert_eq!(topic, "node-red/rvc/commands");
        assert_eq!(payload, "46 2 80");
    }

    #[test]
    fn test_request_parsing() {
        let request: LightRequest = serde_json::from_str(r#"{"action":"on","brightness":200}"#).unwrap();
        assert_eq!(request.action, LightAction::TurnOn);
        assert_eq!(request.brightness, Some(200));

        let request: LightRequest =
            serde_json::from_str(r#"{"action":"send_command","command":21,"level":40}"#).unwrap();
        assert_eq!(request.action, LightAction::SendCommand);
        assert_eq!(request.command, Some(21));

        assert!(serde_json::from_str::<LightRequest>(r#"{"action":"blink"}"#).is_err());
    }
}
