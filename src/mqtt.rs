use rumqttc::{Client, Connection, MqttOptions, QoS};
use tracing::{info, warn};

use crate::command_sink::{CommandSink, PublishError};
use crate::config::MqttConfig;

/// Capacity of the client's outgoing request queue
const REQUEST_CAPACITY: usize = 64;

/// Builds client options from configuration
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keep_alive());
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }
    options
}

/// Creates the client and its connection.
///
/// Nothing goes over the network until the connection is polled; the
/// event loop reconnects on its own when polled after an error.
pub fn connect(config: &MqttConfig) -> (Client, Connection) {
    info!("Connecting to MQTT broker {}:{}", config.host, config.port);
    Client::new(mqtt_options(config), REQUEST_CAPACITY)
}

/// Queues subscriptions for every topic. Returns how many were queued.
pub fn subscribe_all(client: &Client, topics: &[String]) -> usize {
    topics
        .iter()
        .filter(|topic| match client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
            Ok(()) => {
                info!("Subscribed to {}", topic);
                true
            }
            Err(e) => {
                warn!("Failed to subscribe to {}: {}", topic, e);
                false
            }
        })
        .count()
}

/// Publishes commands through the MQTT client without blocking.
pub struct MqttSink {
    client: Client,
}

impl MqttSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl CommandSink for MqttSink {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| PublishError {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_mqtt_options() {
        let config = MqttConfig {
            host: "coach.local".to_string(),
            port: 1884,
            client_id: "router-test".to_string(),
            keep_alive_seconds: 30,
            ..MqttConfig::default()
        };
        let options = mqtt_options(&config);
        assert_eq!(options.broker_address(), ("coach.local".to_string(), 1884));
        assert_eq!(options.client_id(), "router-test");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }

    #[test]
    fn test_sink_queues_without_connection() {
        let (client, _connection) = connect(&MqttConfig::default());
        let mut sink = MqttSink::new(client.clone());
        assert!(sink.publish("RVC/DC_DIMMER_COMMAND_2/46", "46 2 80".to_string()).is_ok());
        assert_eq!(subscribe_all(&client, &["RVC/DC_DIMMER_STATUS_3/+".to_string()]), 1);
    }
}
