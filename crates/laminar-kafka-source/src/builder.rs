//! Connector configuration builder.
//!
//! [`build`] turns a flat [`ConnectorConfig`] into an immutable
//! [`ConnectorConfiguration`]. It never touches the network; every failure
//! is a pure function of the options.
//!
//! Resolution runs in a fixed order and stops at the first error:
//!
//! 1. topic selection
//! 2. startup policy
//! 3. broker connection (`bootstrapServers`, `groupId`, `kafka.*`)
//! 4. output schema

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::config::{keys, ConnectorConfig};
use crate::error::ConnectorError;
use crate::schema::{self, OutputSchema};
use crate::startup::{self, StartupPolicy};
use crate::topic::{self, is_blank, TopicSelection};

/// Broker property carrying the consumer group.
pub const GROUP_ID_PROPERTY: &str = "group.id";
/// Broker property carrying the bootstrap address list.
pub const BOOTSTRAP_SERVERS_PROPERTY: &str = "bootstrap.servers";

/// Broker connection details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Comma-separated broker addresses.
    pub bootstrap_servers: String,
    /// Consumer group identity.
    pub group_id: String,
    /// Pass-through client properties. Never holds `group.id` or
    /// `bootstrap.servers`.
    pub extra_properties: BTreeMap<String, String>,
}

impl ConnectionInfo {
    /// Returns the full broker client property map, sorted by key.
    #[must_use]
    pub fn client_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.extra_properties.clone();
        props.insert(
            BOOTSTRAP_SERVERS_PROPERTY.to_string(),
            self.bootstrap_servers.clone(),
        );
        props.insert(GROUP_ID_PROPERTY.to_string(), self.group_id.clone());
        props
    }

    /// Builds an rdkafka consumer `ClientConfig`.
    ///
    /// Offsets are auto-committed unless `kafka.enable.auto.commit` says
    /// otherwise.
    #[cfg(feature = "kafka")]
    #[must_use]
    pub fn to_rdkafka_config(&self) -> rdkafka::ClientConfig {
        let mut config = rdkafka::ClientConfig::new();
        config.set("enable.auto.commit", "true");
        for (key, value) in self.client_properties() {
            config.set(key, value);
        }
        config
    }
}

/// Fully resolved, immutable source configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfiguration {
    /// Topics to consume.
    pub topics: TopicSelection,
    /// Where consumption starts.
    pub startup: StartupPolicy,
    /// Broker connection.
    pub connection: ConnectionInfo,
    /// Shape of every emitted row.
    pub schema: OutputSchema,
}

/// Builder progress, traced at each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Start,
    TopicResolved,
    StartupPolicyResolved,
    ConfigurationComplete,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "Start",
            Self::TopicResolved => "TopicResolved",
            Self::StartupPolicyResolved => "StartupPolicyResolved",
            Self::ConfigurationComplete => "ConfigurationComplete",
        };
        f.write_str(s)
    }
}

/// Builds a [`ConnectorConfiguration`] from raw options.
///
/// # Errors
///
/// - `ConfigurationError` if neither `topic` nor `topicPattern` is set, or
///   `bootstrapServers` / `groupId` is absent or blank
/// - `TimestampParse` if `startupMode` is `TIMESTAMP` and `startTime` is
///   missing or malformed
pub fn build(options: &ConnectorConfig) -> Result<ConnectorConfiguration, ConnectorError> {
    let mut state = BuildState::Start;
    debug!(%state, options = options.properties().len(), "building Kafka source configuration");

    let topics = topic::resolve(
        options.get(keys::TOPIC),
        options.get(keys::TOPIC_PATTERN),
    )?;
    state = BuildState::TopicResolved;
    debug!(%state, %topics, "topic selection resolved");

    let mode = options.get(keys::STARTUP_MODE).unwrap_or(startup::DEFAULT_STARTUP_MODE);
    let startup = startup::resolve(mode, options.get(keys::START_TIME))?;
    state = BuildState::StartupPolicyResolved;
    debug!(%state, %startup, "startup policy resolved");

    let connection = connection_info(options)?;
    let schema = schema::describe();
    state = BuildState::ConfigurationComplete;
    debug!(
        %state,
        brokers = %connection.bootstrap_servers,
        group_id = %connection.group_id,
        extra_properties = connection.extra_properties.len(),
        "Kafka source configuration complete"
    );

    Ok(ConnectorConfiguration {
        topics,
        startup,
        connection,
        schema,
    })
}

fn connection_info(options: &ConnectorConfig) -> Result<ConnectionInfo, ConnectorError> {
    let bootstrap_servers = require_non_blank(options, keys::BOOTSTRAP_SERVERS)?;
    let group_id = require_non_blank(options, keys::GROUP_ID)?;

    let mut extra_properties = BTreeMap::new();
    for (key, value) in options.properties_with_prefix(keys::KAFKA_PREFIX) {
        if key == GROUP_ID_PROPERTY || key == BOOTSTRAP_SERVERS_PROPERTY {
            warn!(
                property = %key,
                ignored = %value,
                "pass-through property conflicts with a mandatory option and is dropped"
            );
            continue;
        }
        extra_properties.insert(key, value);
    }

    Ok(ConnectionInfo {
        bootstrap_servers,
        group_id,
        extra_properties,
    })
}

fn require_non_blank(options: &ConnectorConfig, key: &str) -> Result<String, ConnectorError> {
    let value = options.require(key)?;
    if is_blank(value) {
        return Err(ConnectorError::config(format!("'{key}' must not be blank")));
    }
    Ok(value.to_string())
}
