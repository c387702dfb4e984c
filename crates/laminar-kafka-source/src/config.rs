//! Flat option map for the Kafka source.
//!
//! [`ConnectorConfig`] holds the string-keyed options a pipeline author
//! supplies, typically from a SQL `WITH (...)` clause or a JSON document.
//! It does no interpretation of its own; the builder in
//! [`crate::builder`] turns it into a typed configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

/// Well-known option keys.
pub mod keys {
    /// Single literal topic name.
    pub const TOPIC: &str = "topic";
    /// Regular expression selecting topics; wins over [`TOPIC`].
    pub const TOPIC_PATTERN: &str = "topicPattern";
    /// Broker address list.
    pub const BOOTSTRAP_SERVERS: &str = "bootstrapServers";
    /// Consumer group identity.
    pub const GROUP_ID: &str = "groupId";
    /// Startup mode name.
    pub const STARTUP_MODE: &str = "startupMode";
    /// Start time for the `TIMESTAMP` startup mode.
    pub const START_TIME: &str = "startTime";
    /// Prefix for pass-through broker client properties.
    pub const KAFKA_PREFIX: &str = "kafka.";
}

/// String-keyed connector options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorConfig {
    properties: HashMap<String, String>,
}

impl ConnectorConfig {
    /// Creates an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` and returns `self` (builder style).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` when the key is not set.
    pub fn require(&self, key: &str) -> Result<&str, ConnectorError> {
        self.get(key)
            .ok_or_else(|| ConnectorError::config(format!("'{key}' must be set")))
    }

    /// Returns every property under `prefix`, with the prefix stripped.
    ///
    /// Entries are sorted by key so callers see a stable order.
    #[must_use]
    pub fn properties_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_string(), v.clone()))
            })
            .collect();
        out.sort();
        out
    }

    /// Returns the underlying property map.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Returns `true` if no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConnectorConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_require() {
        let cfg = ConnectorConfig::new().with(keys::TOPIC, "events");
        assert_eq!(cfg.get(keys::TOPIC), Some("events"));
        assert_eq!(cfg.require(keys::TOPIC).unwrap(), "events");
        assert!(matches!(
            cfg.require(keys::GROUP_ID),
            Err(ConnectorError::ConfigurationError(ref m)) if m == "'groupId' must be set"
        ));
    }

    #[test]
    fn test_properties_with_prefix_sorted_and_stripped() {
        let cfg = ConnectorConfig::new()
            .with("kafka.session.timeout.ms", "10000")
            .with("kafka.client.id", "laminar")
            .with("kafka.", "ignored")
            .with("topic", "events");
        let props = cfg.properties_with_prefix(keys::KAFKA_PREFIX);
        assert_eq!(
            props,
            vec![
                ("client.id".to_string(), "laminar".to_string()),
                ("session.timeout.ms".to_string(), "10000".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_json_document() {
        let cfg: ConnectorConfig = serde_json::from_str(
            r#"{"topic": "events", "groupId": "g1", "bootstrapServers": "localhost:9092"}"#,
        )
        .unwrap();
        assert_eq!(cfg.get(keys::GROUP_ID), Some("g1"));
        assert_eq!(cfg.properties().len(), 3);
    }

    #[test]
    fn test_from_iter() {
        let cfg: ConnectorConfig = [("topic", "a"), ("groupId", "b")].into_iter().collect();
        assert!(!cfg.is_empty());
        assert_eq!(cfg.get("topic"), Some("a"));
    }
}
