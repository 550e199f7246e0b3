//! Unit conversions between RV-C wire values and UI values.
//!
//! Dimmers report brightness as a 0-100 percentage, the UI works in 0-255.
//! Thermostats take setpoints in Celsius on the wire; the UI works in
//! Fahrenheit. All rounding is half-up (`f64::round` on non-negative values).

use tracing::debug;

use crate::error::RvcError;

/// Highest brightness level a dimmer accepts.
pub const DEVICE_BRIGHTNESS_MAX: u8 = 100;
/// Highest UI brightness.
pub const UI_BRIGHTNESS_MAX: u8 = 255;

/// Clamp any integer into the 0-100 device range.
pub fn clamp_brightness(value: i64) -> u8 {
    value.clamp(0, DEVICE_BRIGHTNESS_MAX as i64) as u8
}

/// Clamp into 1-100. An "on" command never carries level 0.
pub fn clamp_on_brightness(value: i64) -> u8 {
    value.clamp(1, DEVICE_BRIGHTNESS_MAX as i64) as u8
}

/// Convert UI brightness (0-255) to device brightness (0-100).
pub fn ui_to_device(ui: u8) -> u8 {
    let scaled = (ui as f64 / UI_BRIGHTNESS_MAX as f64 * DEVICE_BRIGHTNESS_MAX as f64).round();
    clamp_brightness(scaled as i64)
}

/// Convert device brightness (0-100) to UI brightness (0-255).
///
/// Zero stays zero; any lit level maps to at least 1.
pub fn device_to_ui(device: u8) -> u8 {
    if device == 0 {
        return 0;
    }
    let device = device.min(DEVICE_BRIGHTNESS_MAX);
    let scaled = (device as f64 * UI_BRIGHTNESS_MAX as f64 / DEVICE_BRIGHTNESS_MAX as f64).round();
    (scaled as i64).clamp(1, UI_BRIGHTNESS_MAX as i64) as u8
}

/// Fahrenheit to Celsius, rounded to one decimal.
///
/// One-directional: the thermostat echoes Fahrenheit alongside Celsius, so
/// the UI never needs the reverse conversion.
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    round_tenths((fahrenheit - 32.0) * 5.0 / 9.0)
}

pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Clamp a reported or requested value into `[min, max]`, logging when it
/// had to be moved. Out-of-range values are never rejected.
pub fn clamp_reported(field: &str, value: f64, min: f64, max: f64) -> f64 {
    if value < min || value > max {
        debug!(
            "{}; clamping",
            RvcError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            }
        );
    }
    value.clamp(min, max)
}
