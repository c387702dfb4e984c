//! # `LaminarDB` Kafka Source
//!
//! Turns Kafka topics into a stream of Arrow rows with a fixed five-column
//! schema (`message_key`, `message`, `topic`, `topic_partition`,
//! `partition_offset`).
//!
//! Options resolve into a [`ConnectorConfiguration`] without touching the
//! network; a [`BrokerClientAdapter`] turns that into a [`RecordStream`]
//! and a [`PipelineBinder`] attaches it to the host pipeline.
//! [`KafkaSource`] wires the three together.
//!
//! The rdkafka-backed adapter lives in [`kafka`] behind the `kafka` feature.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Broker client adapter trait and record stream
pub mod adapter;

/// Initial partition assignment planning
pub mod assignment;

/// Pipeline binder trait and the default bound source
pub mod binder;

/// Options to immutable configuration
pub mod builder;

/// Flat option map
pub mod config;

/// Connector error types
pub mod error;

/// rdkafka-backed broker client adapter
#[cfg(feature = "kafka")]
pub mod kafka;

/// Fixed output schema and record mapping
pub mod schema;

/// Source operator facade
pub mod source;

/// Startup policy resolution
pub mod startup;

/// Topic selection
pub mod topic;

pub use adapter::{BrokerClientAdapter, RecordStream};
pub use binder::{BoundSource, DefaultBinder, PipelineBinder};
pub use builder::{build, ConnectionInfo, ConnectorConfiguration};
pub use config::ConnectorConfig;
pub use error::{ConnectorError, ConnectorResult};
pub use schema::{describe, BrokerRecord, FieldType, OutputSchema};
pub use source::{KafkaSource, DEFAULT_SOURCE_NAME};
pub use startup::StartupPolicy;
pub use topic::TopicSelection;
