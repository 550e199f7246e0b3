use std::time::{Duration, Instant};
use tracing::info;

use crate::device_manager::HandlerStats;

/// Application-level metrics for tracking MQTT traffic and device handling
pub struct AppMetrics {
    /// Number of MQTT publishes received
    pub mqtt_messages: u64,
    /// Number of status messages applied to a device
    pub status_updates: u64,
    /// Number of devices created from bus traffic
    pub discoveries: u64,
    /// Number of commands handed to the MQTT client
    pub commands_published: u64,
    /// Number of status payloads that were not JSON objects
    pub malformed_payloads: u64,
    pub sensor_updates: u64,
    /// Number of MQTT connection errors encountered
    pub mqtt_errors: u64,
}

impl AppMetrics {
    /// Create a new AppMetrics instance with all counters at zero
    pub fn new() -> Self {
        Self {
            mqtt_messages: 0,
            status_updates: 0,
            discoveries: 0,
            commands_published: 0,
            malformed_payloads: 0,
            sensor_updates: 0,
            mqtt_errors: 0,
        }
    }

    /// Add the device manager's counters
    pub fn absorb(&mut self, stats: HandlerStats) {
        self.status_updates += stats.status_updates;
        self.discoveries += stats.discoveries;
        self.commands_published += stats.commands_published;
        self.malformed_payloads += stats.malformed_payloads;
        self.sensor_updates += stats.sensor_updates;
    }

    /// Reset all counters to zero
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Log current metrics to the info log
    pub fn log(&self) {
        info!(
            "[Metrics] MQTT messages: {}, Status updates: {}, Discoveries: {}, Commands: {}, Malformed: {}, Sensor updates: {}, MQTT errors: {}",
            self.mqtt_messages,
            self.status_updates,
            self.discoveries,
            self.commands_published,
            self.malformed_payloads,
            self.sensor_updates,
            self.mqtt_errors
        );
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Manages periodic logging of application metrics
pub struct MetricsLogger {
    last_log: Instant,
    log_interval: Duration,
}

impl MetricsLogger {
    /// Create a new MetricsLogger with the specified logging interval
    pub fn new(log_interval: Duration) -> Self {
        Self {
            last_log: Instant::now(),
            log_interval,
        }
    }

    /// Check if it's time to log metrics, and if so, log them and reset
    /// Returns true if metrics were logged
    pub fn check_and_log(&mut self, metrics: &mut AppMetrics) -> bool {
        if self.last_log.elapsed() >= self.log_interval {
            metrics.log();
            metrics.reset();
            self.last_log = Instant::now();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = AppMetrics::new();
        assert_eq!(metrics.mqtt_messages, 0);
        assert_eq!(metrics.status_updates, 0);
        assert_eq!(metrics.discoveries, 0);
        assert_eq!(metrics.commands_published, 0);
        assert_eq!(metrics.mqtt_errors, 0);
    }

    #[test]
    fn test_absorb_and_reset() {
        let mut metrics = AppMetrics::new();
        metrics.mqtt_messages = 100;
        metrics.mqtt_errors = 2;
        let stats = HandlerStats {
            status_updates: 40,
            discoveries: 3,
            commands_published: 5,
            malformed_payloads: 1,
            sensor_updates: 7,
        };
        metrics.absorb(stats);
        metrics.absorb(stats);
        assert_eq!(metrics.status_updates, 80);
        assert_eq!(metrics.discoveries, 6);
        assert_eq!(metrics.sensor_updates, 14);

        metrics.reset();

        assert_eq!(metrics.mqtt_messages, 0);
        assert_eq!(metrics.status_updates, 0);
        assert_eq!(metrics.malformed_payloads, 0);
        assert_eq!(metrics.mqtt_errors, 0);
    }

    #[test]
    fn test_metrics_logger_interval() {
        let mut logger = MetricsLogger::new(Duration::from_millis(50));
        let mut metrics = AppMetrics::new();

        // Should not log immediately
        assert!(!logger.check_and_log(&mut metrics));

        // Wait for interval
        std::thread::sleep(Duration::from_millis(60));

        // Should log now
        assert!(logger.check_and_log(&mut metrics));

        // Should not log immediately after
        assert!(!logger.check_and_log(&mut metrics));
    }
}
