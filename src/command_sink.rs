use thiserror::Error;

#[derive(Debug, Error)]
#[error("publish to {topic} failed: {reason}")]
pub struct PublishError {
    pub topic: String,
    pub reason: String,
}

/// Outbound side of the bus. Publishing is fire-and-forget: the caller
/// does not wait for the broker to acknowledge.
pub trait CommandSink: Send {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), PublishError>;
}

/// Sink that records every publish, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub published: Vec<(String, String)>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingSink {
    pub fn last(&self) -> Option<(&str, serde_json::Value)> {
        self.published.last().map(|(topic, payload)| {
            (
                topic.as_str(),
                serde_json::from_str(payload).unwrap_or(serde_json::Value::String(payload.clone())),
            )
        })
    }
}

#[cfg(test)]
impl CommandSink for RecordingSink {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError {
                topic: topic.to_string(),
                reason: "request queue full".to_string(),
            });
        }
        self.published.push((topic.to_string(), payload));
        Ok(())
    }
}
