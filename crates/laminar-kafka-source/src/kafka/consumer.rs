//! rdkafka consumer adapter.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::context::TracingConsumerContext;

use crate::adapter::{BrokerClientAdapter, RecordStream, DEFAULT_CHANNEL_CAPACITY};
use crate::assignment::{self, PartitionStart, StartPosition, TopicMetadata};
use crate::builder::ConnectorConfiguration;
use crate::error::ConnectorError;
use crate::schema::BrokerRecord;
use crate::topic::TopicSelection;

type TracingConsumer = StreamConsumer<TracingConsumerContext>;

/// Default timeout for metadata and offset lookups.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// [`BrokerClientAdapter`] backed by an rdkafka `StreamConsumer`.
#[derive(Debug, Clone)]
pub struct RdKafkaAdapter {
    metadata_timeout: Duration,
    channel_capacity: usize,
}

impl Default for RdKafkaAdapter {
    fn default() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RdKafkaAdapter {
    /// Creates an adapter with default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout for metadata and offset-for-time lookups.
    #[must_use]
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Sets the capacity of the reader task's channel.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

#[async_trait]
impl BrokerClientAdapter for RdKafkaAdapter {
    async fn open(&self, config: ConnectorConfiguration) -> Result<RecordStream, ConnectorError> {
        // Fail on an unsupported mode before creating a client.
        assignment::start_position(&config.startup)?;

        info!(
            brokers = %config.connection.bootstrap_servers,
            group_id = %config.connection.group_id,
            topics = %config.topics,
            startup = %config.startup,
            "opening Kafka consumer"
        );

        let timeout = self.metadata_timeout;
        // Metadata and offset lookups block, so the whole setup runs off
        // the async workers.
        let consumer = tokio::task::spawn_blocking(move || connect(&config, timeout))
            .await
            .map_err(|e| ConnectorError::Internal(format!("consumer setup task failed: {e}")))??;

        Ok(spawn_reader(consumer, self.channel_capacity))
    }
}

fn connect(
    config: &ConnectorConfiguration,
    timeout: Duration,
) -> Result<TracingConsumer, ConnectorError> {
    let consumer: TracingConsumer = config
        .connection
        .to_rdkafka_config()
        .create_with_context(TracingConsumerContext)
        .map_err(|e| ConnectorError::ConnectionFailed(format!("failed to create consumer: {e}")))?;

    let metadata = fetch_topic_metadata(&consumer, &config.topics, timeout)?;
    let plan = assignment::plan(&config.topics, &config.startup, &metadata)?;
    let tpl = to_partition_list(&consumer, &plan, timeout)?;

    consumer
        .assign(&tpl)
        .map_err(|e| {
            ConnectorError::ConnectionFailed(format!("failed to assign partitions: {e}"))
        })?;
    info!(partitions = plan.len(), "assigned Kafka partitions");
    Ok(consumer)
}

fn fetch_topic_metadata(
    consumer: &TracingConsumer,
    selection: &TopicSelection,
    timeout: Duration,
) -> Result<TopicMetadata, ConnectorError> {
    let topic = match selection {
        TopicSelection::SingleTopic(name) => Some(name.as_str()),
        TopicSelection::Pattern(_) => None,
    };
    let metadata = consumer
        .fetch_metadata(topic, timeout)
        .map_err(|e| ConnectorError::ConnectionFailed(format!("failed to fetch metadata: {e}")))?;

    let topics: TopicMetadata = metadata
        .topics()
        .iter()
        .filter(|t| t.error().is_none())
        .map(|t| {
            let partitions = t.partitions().iter().map(|p| p.id()).collect();
            (t.name().to_string(), partitions)
        })
        .collect();
    debug!(topics = topics.len(), "fetched Kafka metadata");
    Ok(topics)
}

fn to_partition_list(
    consumer: &TracingConsumer,
    plan: &[PartitionStart],
    timeout: Duration,
) -> Result<TopicPartitionList, ConnectorError> {
    let mut tpl = TopicPartitionList::with_capacity(plan.len());
    let mut by_time = TopicPartitionList::new();

    for start in plan {
        let offset = match start.position {
            StartPosition::Beginning => Offset::Beginning,
            StartPosition::End => Offset::End,
            StartPosition::Committed => Offset::Stored,
            StartPosition::Timestamp(ms) => {
                by_time
                    .add_partition_offset(&start.topic, start.partition, Offset::Offset(ms))
                    .map_err(|e| ConnectorError::Internal(e.to_string()))?;
                continue;
            }
        };
        tpl.add_partition_offset(&start.topic, start.partition, offset)
            .map_err(|e| ConnectorError::Internal(e.to_string()))?;
    }

    if by_time.count() > 0 {
        let resolved = consumer.offsets_for_times(by_time, timeout).map_err(|e| {
            ConnectorError::ConnectionFailed(format!("failed to look up offsets by time: {e}"))
        })?;
        for elem in resolved.elements() {
            let offset =
                offset_by_time(elem.topic(), elem.partition(), elem.offset(), elem.error())?;
            debug!(
                topic = elem.topic(),
                partition = elem.partition(),
                ?offset,
                "resolved start offset by time"
            );
            tpl.add_partition_offset(elem.topic(), elem.partition(), offset)
                .map_err(|e| ConnectorError::Internal(e.to_string()))?;
        }
    }

    Ok(tpl)
}

/// Checks one `offsets_for_times` result.
///
/// A concrete offset is used as is and `End` means no record at or after
/// the time, so the partition starts at the end. A per-partition error or
/// any other offset fails the open.
fn offset_by_time(
    topic: &str,
    partition: i32,
    offset: Offset,
    error: KafkaResult<()>,
) -> Result<Offset, ConnectorError> {
    if let Err(e) = error {
        return Err(ConnectorError::ConnectionFailed(format!(
            "failed to look up start offset by time for {topic}[{partition}]: {e}"
        )));
    }
    match offset {
        Offset::Offset(_) | Offset::End => Ok(offset),
        other => Err(ConnectorError::ConnectionFailed(format!(
            "unexpected start offset {other:?} by time for {topic}[{partition}]"
        ))),
    }
}

fn spawn_reader(consumer: TracingConsumer, capacity: usize) -> RecordStream {
    let (msg_tx, msg_rx) = mpsc::channel(capacity);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let reader = tokio::spawn(async move {
        loop {
            let msg_result = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                msg = consumer.recv() => msg,
            };
            let record = match msg_result {
                Ok(msg) => BrokerRecord {
                    key: msg.key().map(<[u8]>::to_vec),
                    payload: msg.payload().map(<[u8]>::to_vec),
                    topic: msg.topic().to_string(),
                    partition: msg.partition(),
                    offset: msg.offset(),
                },
                Err(e) => {
                    warn!(error = %e, "Kafka consumer error");
                    continue;
                }
            };
            if msg_tx.send(record).await.is_err() {
                break;
            }
        }
        let _ = consumer.unassign();
        debug!("Kafka reader task stopped");
    });

    RecordStream::with_reader(msg_rx, shutdown_tx, reader)
}

#[cfg(test)]
mod tests {
    use rdkafka::error::KafkaError;
    use rdkafka::types::RDKafkaErrorCode;

    use super::*;
    use crate::builder;
    use crate::config::{keys, ConnectorConfig};

    #[tokio::test]
    async fn test_unrecognized_mode_rejected_before_connect() {
        let options = ConnectorConfig::new()
            .with(keys::TOPIC, "orders")
            .with(keys::BOOTSTRAP_SERVERS, "127.0.0.1:1")
            .with(keys::GROUP_ID, "g1")
            .with(keys::STARTUP_MODE, "SPECIFIC_OFFSETS");
        let config = builder::build(&options).unwrap();
        let err = RdKafkaAdapter::new().open(config).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::ConfigurationError(ref m) if m.contains("SPECIFIC_OFFSETS")
        ));
    }

    #[test]
    fn test_offset_by_time_keeps_found_offset_and_end() {
        assert_eq!(
            offset_by_time("orders", 0, Offset::Offset(42), Ok(())).unwrap(),
            Offset::Offset(42)
        );
        assert_eq!(
            offset_by_time("orders", 1, Offset::End, Ok(())).unwrap(),
            Offset::End
        );
    }

    #[test]
    fn test_offset_by_time_partition_error_fails() {
        let err = offset_by_time(
            "orders",
            3,
            Offset::Invalid,
            Err(KafkaError::OffsetFetch(RDKafkaErrorCode::LeaderNotAvailable)),
        )
        .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("orders[3]"), "{err}");
    }

    #[test]
    fn test_offset_by_time_rejects_unexpected_offset() {
        let err = offset_by_time("orders", 0, Offset::Invalid, Ok(())).unwrap_err();
        assert!(matches!(err, ConnectorError::ConnectionFailed(ref m) if m.contains("orders[0]")));
    }

    #[test]
    fn test_builder_settings() {
        let adapter = RdKafkaAdapter::new()
            .with_metadata_timeout(Duration::from_secs(1))
            .with_channel_capacity(0);
        assert_eq!(adapter.metadata_timeout, Duration::from_secs(1));
        assert_eq!(adapter.channel_capacity, 1);
    }
}
