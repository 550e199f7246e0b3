//! MQTT topic conventions: one topic per instance, `<prefix>/<instance>`.

/// Extract the instance from a topic of the exact form `<prefix>/<digits>`.
///
/// Topics with trailing segments (`<prefix>/25/set`) or instances outside
/// `u8` do not match.
pub fn instance_from_topic(topic: &str, prefix: &str) -> Option<u8> {
    let rest = topic.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Build the topic for one instance.
pub fn instance_topic(prefix: &str, instance: u8) -> String {
    format!("{}/{}", prefix, instance)
}

/// Single-level wildcard subscription covering every instance under a prefix.
pub fn wildcard_topic(prefix: &str) -> String {
    format!("{}/+", prefix)
}
