//! End-to-end tests: options through an in-memory broker to Arrow batches.

use std::collections::BTreeMap;

use arrow_array::{Array, Int32Array, Int64Array, RecordBatch, StringArray};
use async_trait::async_trait;

use laminar_kafka_source::adapter::{BrokerClientAdapter, RecordStream};
use laminar_kafka_source::assignment::{self, StartPosition, TopicMetadata};
use laminar_kafka_source::config::keys;
use laminar_kafka_source::startup::parse_start_time;
use laminar_kafka_source::{
    BrokerRecord, ConnectorConfig, ConnectorConfiguration, ConnectorError, KafkaSource,
};

/// One stored record: (timestamp ms, key, payload).
type Stored = (i64, Option<&'static str>, Option<&'static str>);

/// Broker stand-in holding fixed partition logs and committed offsets.
#[derive(Default)]
struct InMemoryBroker {
    logs: BTreeMap<(String, i32), Vec<Stored>>,
    committed: BTreeMap<(String, i32), i64>,
}

impl InMemoryBroker {
    fn with_log(mut self, topic: &str, partition: i32, records: Vec<Stored>) -> Self {
        self.logs.insert((topic.to_string(), partition), records);
        self
    }

    fn with_committed(mut self, topic: &str, partition: i32, offset: i64) -> Self {
        self.committed.insert((topic.to_string(), partition), offset);
        self
    }

    fn metadata(&self) -> TopicMetadata {
        let mut m = TopicMetadata::new();
        for (topic, partition) in self.logs.keys() {
            m.entry(topic.clone()).or_insert_with(Vec::new).push(*partition);
        }
        m
    }
}

#[async_trait]
impl BrokerClientAdapter for InMemoryBroker {
    async fn open(&self, config: ConnectorConfiguration) -> Result<RecordStream, ConnectorError> {
        let plan = assignment::plan(&config.topics, &config.startup, &self.metadata())?;
        let (tx, stream) = RecordStream::channel(1024);

        for start in plan {
            let key = (start.topic.clone(), start.partition);
            let log = &self.logs[&key];
            let first = match start.position {
                StartPosition::Beginning => 0,
                StartPosition::End => log.len(),
                StartPosition::Committed => {
                    usize::try_from(self.committed.get(&key).copied().unwrap_or(0)).unwrap()
                }
                StartPosition::Timestamp(ms) => log
                    .iter()
                    .position(|(ts, _, _)| *ts >= ms)
                    .unwrap_or(log.len()),
            };
            for (offset, (_, k, v)) in log.iter().enumerate().skip(first) {
                let offset = i64::try_from(offset).unwrap();
                let mut rec = BrokerRecord::new(&start.topic, start.partition, offset);
                rec.key = k.map(|s| s.as_bytes().to_vec());
                rec.payload = v.map(|s| s.as_bytes().to_vec());
                tx.send(rec).await.unwrap();
            }
        }
        Ok(stream)
    }
}

fn local_ms(s: &str) -> i64 {
    parse_start_time(s, &chrono::Local).unwrap()
}

fn broker() -> InMemoryBroker {
    InMemoryBroker::default()
        .with_log(
            "orders-eu",
            0,
            vec![
                (local_ms("2023-01-15 10:00:00"), Some("a"), Some("eu-0")),
                (local_ms("2023-01-15 10:30:00"), Some("b"), Some("eu-1")),
                (local_ms("2023-01-15 11:00:00"), None, Some("eu-2")),
            ],
        )
        .with_log(
            "orders-us",
            0,
            vec![(local_ms("2023-01-15 09:00:00"), Some("c"), None)],
        )
        .with_log(
            "orders-us",
            1,
            vec![
                (local_ms("2023-01-15 10:29:59"), Some("d"), Some("us-1-0")),
                (local_ms("2023-01-15 10:30:00"), Some("e"), Some("us-1-1")),
            ],
        )
        .with_log("payments", 0, vec![(0, None, Some("p"))])
        .with_committed("orders-eu", 0, 2)
}

fn options() -> ConnectorConfig {
    ConnectorConfig::new()
        .with(keys::BOOTSTRAP_SERVERS, "localhost:9092")
        .with(keys::GROUP_ID, "pipeline")
}

fn strings(batch: &RecordBatch, col: usize) -> Vec<Option<String>> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    (0..arr.len())
        .map(|i| (!arr.is_null(i)).then(|| arr.value(i).to_string()))
        .collect()
}

#[tokio::test]
async fn test_pattern_from_earliest() {
    let opts = options()
        .with(keys::TOPIC_PATTERN, "orders-.*")
        .with(keys::STARTUP_MODE, "EARLIEST");
    let mut bound = KafkaSource::new(broker()).open(&opts).await.unwrap();

    let batch = bound.poll_batch(100).unwrap().unwrap();
    assert_eq!(batch.num_rows(), 6);
    assert_eq!(
        strings(&batch, 2),
        vec![
            Some("orders-eu".into()),
            Some("orders-eu".into()),
            Some("orders-eu".into()),
            Some("orders-us".into()),
            Some("orders-us".into()),
            Some("orders-us".into()),
        ]
    );
    assert_eq!(strings(&batch, 1)[3], None);
    assert_eq!(strings(&batch, 0)[2], None);

    let partitions = batch
        .column(3)
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap();
    assert_eq!(partitions.values().to_vec(), vec![0, 0, 0, 0, 1, 1]);
    assert!(bound.poll_batch(100).unwrap().is_none());
    assert!(bound.is_exhausted());
}

#[tokio::test]
async fn test_topic_ignored_when_pattern_set() {
    let opts = options()
        .with(keys::TOPIC, "payments")
        .with(keys::TOPIC_PATTERN, "orders-eu")
        .with(keys::STARTUP_MODE, "earliest");
    let mut bound = KafkaSource::new(broker()).open(&opts).await.unwrap();
    let batch = bound.poll_batch(100).unwrap().unwrap();
    assert!(strings(&batch, 2)
        .iter()
        .all(|t| t.as_deref() == Some("orders-eu")));
}

#[tokio::test]
async fn test_timestamp_startup() {
    let opts = options()
        .with(keys::TOPIC_PATTERN, "orders-.*")
        .with(keys::STARTUP_MODE, "TIMESTAMP")
        .with(keys::START_TIME, "2023-01-15 10:30:00");
    let mut bound = KafkaSource::new(broker()).open(&opts).await.unwrap();

    let batch = bound.poll_batch(100).unwrap().unwrap();
    assert_eq!(
        strings(&batch, 1),
        vec![
            Some("eu-1".into()),
            Some("eu-2".into()),
            Some("us-1-1".into())
        ]
    );
    let offsets = batch
        .column(4)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(offsets.values().to_vec(), vec![1, 2, 1]);
}

#[tokio::test]
async fn test_group_offsets_default_and_latest() {
    let opts = options().with(keys::TOPIC, "orders-eu");
    let mut bound = KafkaSource::new(broker()).open(&opts).await.unwrap();
    let batch = bound.poll_batch(100).unwrap().unwrap();
    assert_eq!(strings(&batch, 1), vec![Some("eu-2".into())]);

    let opts = options()
        .with(keys::TOPIC, "orders-eu")
        .with(keys::STARTUP_MODE, "latest");
    let mut bound = KafkaSource::new(broker()).open(&opts).await.unwrap();
    assert!(bound.poll_batch(100).unwrap().is_none());
}

#[tokio::test]
async fn test_batches_split_by_limit() {
    let opts = options()
        .with(keys::TOPIC_PATTERN, "orders-.*")
        .with(keys::STARTUP_MODE, "EARLIEST");
    let mut bound = KafkaSource::new(broker())
        .with_name("orders")
        .open(&opts)
        .await
        .unwrap();
    let sizes: Vec<usize> = std::iter::from_fn(|| bound.poll_batch(4).unwrap())
        .map(|b| b.num_rows())
        .collect();
    assert_eq!(sizes, vec![4, 2]);
    assert_eq!(bound.records_polled(), 6);
    bound.close().await.unwrap();
}

#[tokio::test]
async fn test_errors_surface_unchanged() {
    let source = KafkaSource::new(broker());

    let err = source.open(&options()).await.unwrap_err();
    assert!(matches!(err, ConnectorError::ConfigurationError(_)));

    let opts = options()
        .with(keys::TOPIC, "orders-eu")
        .with(keys::STARTUP_MODE, "TIMESTAMP")
        .with(keys::START_TIME, "not-a-date");
    let err = source.open(&opts).await.unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::TimestampParse { ref input, .. } if input == "not-a-date"
    ));

    let opts = options()
        .with(keys::TOPIC, "orders-eu")
        .with(keys::STARTUP_MODE, "SPECIFIC_OFFSETS");
    let err = source.open(&opts).await.unwrap_err();
    assert!(err.to_string().contains("SPECIFIC_OFFSETS"));

    let opts = options().with(keys::TOPIC, "missing");
    let err = source.open(&opts).await.unwrap_err();
    assert!(err.to_string().contains("'missing'"));
}

#[tokio::test]
async fn test_options_from_json() {
    let opts: ConnectorConfig = serde_json::from_str(
        r#"{
            "topicPattern": "payments",
            "bootstrapServers": "localhost:9092",
            "groupId": "pipeline",
            "startupMode": "Earliest",
            "startTime": "ignored",
            "kafka.group.id": "ignored-too"
        }"#,
    )
    .unwrap();
    let mut bound = KafkaSource::new(broker()).open(&opts).await.unwrap();
    let batch = bound.poll_batch(10).unwrap().unwrap();
    assert_eq!(strings(&batch, 1), vec![Some("p".into())]);
}
