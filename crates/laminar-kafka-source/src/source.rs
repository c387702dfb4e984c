//! Kafka source operator.
//!
//! [`KafkaSource`] is the entry point a pipeline uses: options go in, a
//! bound source comes out. In between it builds the configuration, opens
//! the broker client adapter and hands the record stream to the binder.

use tracing::{info, warn};

use crate::adapter::BrokerClientAdapter;
use crate::binder::{DefaultBinder, PipelineBinder};
use crate::builder;
use crate::config::{keys, ConnectorConfig};
use crate::error::ConnectorError;
use crate::topic::is_blank;

/// Name a source is bound under unless another is set.
pub const DEFAULT_SOURCE_NAME: &str = "kafka";

/// Kafka source operator.
///
/// # Lifecycle
///
/// 1. Create with [`KafkaSource::new`] around a [`BrokerClientAdapter`]
/// 2. Optionally rename with [`KafkaSource::with_name`] or swap the binder
///    with [`KafkaSource::with_binder`]
/// 3. Call [`KafkaSource::open`] with the user's options
#[derive(Debug)]
pub struct KafkaSource<A, B = DefaultBinder> {
    name: String,
    adapter: A,
    binder: B,
}

impl<A: BrokerClientAdapter> KafkaSource<A, DefaultBinder> {
    /// Creates a source using `adapter` and the default binder.
    #[must_use]
    pub fn new(adapter: A) -> Self {
        Self {
            name: DEFAULT_SOURCE_NAME.to_string(),
            adapter,
            binder: DefaultBinder::default(),
        }
    }
}

impl<A: BrokerClientAdapter, B: PipelineBinder> KafkaSource<A, B> {
    /// Sets the name the source is bound under.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the pipeline binder.
    #[must_use]
    pub fn with_binder<B2: PipelineBinder>(self, binder: B2) -> KafkaSource<A, B2> {
        KafkaSource {
            name: self.name,
            adapter: self.adapter,
            binder,
        }
    }

    /// Returns the bind name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the broker client adapter.
    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Resolves `options`, opens the adapter and binds the resulting stream.
    ///
    /// No connection is attempted if the options do not resolve.
    ///
    /// # Errors
    ///
    /// Returns any error from [`builder::build`], from the adapter's
    /// `open`, or from the binder.
    pub async fn open(&self, options: &ConnectorConfig) -> Result<B::Bound, ConnectorError> {
        if let (Some(topic), Some(pattern)) =
            (options.get(keys::TOPIC), options.get(keys::TOPIC_PATTERN))
        {
            if !is_blank(topic) && !is_blank(pattern) {
                warn!(
                    topic = %topic,
                    topic_pattern = %pattern,
                    "both topic and topicPattern are set; topic is ignored"
                );
            }
        }

        let config = builder::build(options)?;
        info!(
            source = %self.name,
            topics = %config.topics,
            startup = %config.startup,
            brokers = %config.connection.bootstrap_servers,
            group_id = %config.connection.group_id,
            "opening Kafka source"
        );

        let schema = config.schema.clone();
        let stream = self.adapter.open(config).await?;
        self.binder.bind(&self.name, stream, &schema)
    }
}
