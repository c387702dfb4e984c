//! Output schema of the Kafka source.
//!
//! Every record becomes one row with five columns, in this order:
//!
//! | column | type | nullable |
//! |---|---|---|
//! | `message_key` | `String` | yes |
//! | `message` | `String` | yes |
//! | `topic` | `String` | no |
//! | `topic_partition` | `Int` (32-bit) | no |
//! | `partition_offset` | `Long` (64-bit) | no |
//!
//! The schema is fixed; it does not depend on any option.

use std::fmt;
use std::sync::Arc;

use arrow_array::builder::{Int32Builder, Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema, SchemaRef};

use crate::error::ConnectorError;

/// Column holding the record key.
pub const MESSAGE_KEY: &str = "message_key";
/// Column holding the record payload.
pub const MESSAGE: &str = "message";
/// Column holding the source topic.
pub const TOPIC: &str = "topic";
/// Column holding the partition number.
pub const TOPIC_PARTITION: &str = "topic_partition";
/// Column holding the partition offset.
pub const PARTITION_OFFSET: &str = "partition_offset";

/// Logical column types of the output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
}

impl FieldType {
    /// Returns the Arrow data type for this column type.
    #[must_use]
    pub fn to_arrow(self) -> DataType {
        match self {
            Self::String => DataType::Utf8,
            Self::Int => DataType::Int32,
            Self::Long => DataType::Int64,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "STRING",
            Self::Int => "INT",
            Self::Long => "LONG",
        };
        f.write_str(name)
    }
}

const FIELDS: [(&str, FieldType); 5] = [
    (MESSAGE_KEY, FieldType::String),
    (MESSAGE, FieldType::String),
    (TOPIC, FieldType::String),
    (TOPIC_PARTITION, FieldType::Int),
    (PARTITION_OFFSET, FieldType::Long),
];

/// One raw record handed over by a broker client adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRecord {
    /// Record key bytes, if the record has a key.
    pub key: Option<Vec<u8>>,
    /// Record payload bytes; `None` for tombstones.
    pub payload: Option<Vec<u8>>,
    /// Topic the record was read from.
    pub topic: String,
    /// Partition within the topic.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
}

impl BrokerRecord {
    /// Creates a record with no key and no payload.
    #[must_use]
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            key: None,
            payload: None,
            topic: topic.into(),
            partition,
            offset,
        }
    }

    /// Sets the record key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the record payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

/// The fixed five-column output schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    fields: Vec<(String, FieldType)>,
}

/// Returns the output schema of the Kafka source.
#[must_use]
pub fn describe() -> OutputSchema {
    OutputSchema {
        fields: FIELDS
            .iter()
            .map(|(name, ty)| ((*name).to_string(), *ty))
            .collect(),
    }
}

impl OutputSchema {
    /// Returns `(name, type)` pairs in column order.
    #[must_use]
    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    /// Returns column names in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns column types in order.
    #[must_use]
    pub fn field_types(&self) -> Vec<FieldType> {
        self.fields.iter().map(|(_, t)| *t).collect()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the schema as an Arrow schema.
    ///
    /// Key and message are nullable; the coordinates are not.
    #[must_use]
    pub fn to_arrow(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|(name, ty)| {
                let nullable = name == MESSAGE_KEY || name == MESSAGE;
                Field::new(name, ty.to_arrow(), nullable)
            })
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Maps records to one Arrow batch, one row per record.
    ///
    /// Key and payload bytes are decoded as UTF-8, replacing invalid
    /// sequences with U+FFFD. Missing key or payload becomes null.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Arrow` if the batch cannot be assembled.
    pub fn to_record_batch(&self, records: &[BrokerRecord]) -> Result<RecordBatch, ConnectorError> {
        let n = records.len();
        let mut keys = StringBuilder::with_capacity(n, n * 16);
        let mut messages = StringBuilder::with_capacity(n, n * 128);
        let mut topics = StringBuilder::with_capacity(n, n * 16);
        let mut partitions = Int32Builder::with_capacity(n);
        let mut offsets = Int64Builder::with_capacity(n);

        for rec in records {
            match &rec.key {
                Some(k) => keys.append_value(String::from_utf8_lossy(k)),
                None => keys.append_null(),
            }
            match &rec.payload {
                Some(p) => messages.append_value(String::from_utf8_lossy(p)),
                None => messages.append_null(),
            }
            topics.append_value(&rec.topic);
            partitions.append_value(rec.partition);
            offsets.append_value(rec.offset);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(keys.finish()),
            Arc::new(messages.finish()),
            Arc::new(topics.finish()),
            Arc::new(partitions.finish()),
            Arc::new(offsets.finish()),
        ];
        Ok(RecordBatch::try_new(self.to_arrow(), columns)?)
    }
}

impl Default for OutputSchema {
    fn default() -> Self {
        describe()
    }
}
