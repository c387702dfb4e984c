//! Pipeline binding.
//!
//! A [`PipelineBinder`] attaches an adapter's [`RecordStream`] to the host
//! pipeline. [`DefaultBinder`] produces a [`BoundSource`]: a named source
//! tagged with the output schema that drains the stream into Arrow
//! `RecordBatch`es on demand.

use std::fmt;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use tracing::{debug, info};

use crate::adapter::RecordStream;
use crate::error::ConnectorError;
use crate::schema::{BrokerRecord, OutputSchema};

/// Default upper bound on rows per polled batch.
pub const DEFAULT_MAX_POLL_RECORDS: usize = 1000;

/// Attaches a record stream to a host pipeline.
pub trait PipelineBinder {
    /// What the host gets back.
    type Bound;

    /// Binds `stream` under `name` with rows shaped by `schema`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` if the binding is
    /// rejected, for example because `name` is blank.
    fn bind(
        &self,
        name: &str,
        stream: RecordStream,
        schema: &OutputSchema,
    ) -> Result<Self::Bound, ConnectorError>;
}

/// Lifecycle of a [`BoundSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Accepting polls.
    Running,
    /// Closed; polls fail.
    Closed,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("Running"),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

/// Binder producing [`BoundSource`]s.
#[derive(Debug, Clone, Copy)]
pub struct DefaultBinder {
    max_poll_records: usize,
}

impl DefaultBinder {
    /// Creates a binder whose sources cap each batch at `max_poll_records`.
    #[must_use]
    pub fn new(max_poll_records: usize) -> Self {
        Self { max_poll_records }
    }
}

impl Default for DefaultBinder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POLL_RECORDS)
    }
}

impl PipelineBinder for DefaultBinder {
    type Bound = BoundSource;

    fn bind(
        &self,
        name: &str,
        stream: RecordStream,
        schema: &OutputSchema,
    ) -> Result<BoundSource, ConnectorError> {
        if name.trim().is_empty() {
            return Err(ConnectorError::config("source name must not be blank"));
        }
        if self.max_poll_records == 0 {
            return Err(ConnectorError::config("max poll records must be > 0"));
        }
        info!(
            source = %name,
            columns = schema.len(),
            max_poll_records = self.max_poll_records,
            "bound Kafka source"
        );
        Ok(BoundSource {
            name: name.to_string(),
            arrow_schema: schema.to_arrow(),
            schema: schema.clone(),
            stream,
            state: SourceState::Running,
            max_poll_records: self.max_poll_records,
            records_polled: 0,
        })
    }
}

/// A named, schema-tagged source backed by a record stream.
pub struct BoundSource {
    name: String,
    schema: OutputSchema,
    arrow_schema: SchemaRef,
    stream: RecordStream,
    state: SourceState,
    max_poll_records: usize,
    records_polled: u64,
}

impl BoundSource {
    /// Returns the name the source was bound under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the output schema.
    #[must_use]
    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    /// Returns the Arrow schema of every emitted batch.
    #[must_use]
    pub fn arrow_schema(&self) -> SchemaRef {
        self.arrow_schema.clone()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Returns the number of records emitted so far.
    #[must_use]
    pub fn records_polled(&self) -> u64 {
        self.records_polled
    }

    /// Returns `true` once the adapter stopped and all records were polled.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.stream.is_exhausted()
    }

    /// Drains up to `max_records` buffered records into one batch.
    ///
    /// Never waits. Returns `Ok(None)` when nothing is buffered.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::InvalidState` after [`BoundSource::close`]
    /// and `ConnectorError::ReadError` if the batch cannot be assembled.
    pub fn poll_batch(
        &mut self,
        max_records: usize,
    ) -> Result<Option<RecordBatch>, ConnectorError> {
        if self.state != SourceState::Running {
            return Err(ConnectorError::InvalidState {
                expected: SourceState::Running.to_string(),
                actual: self.state.to_string(),
            });
        }

        let limit = max_records.min(self.max_poll_records);
        let mut records: Vec<BrokerRecord> = Vec::with_capacity(limit);
        while records.len() < limit {
            match self.stream.try_next() {
                Some(rec) => records.push(rec),
                None => break,
            }
        }

        if records.is_empty() {
            return Ok(None);
        }

        let batch = self
            .schema
            .to_record_batch(&records)
            .map_err(|e| ConnectorError::ReadError(format!("failed to build batch: {e}")))?;
        self.records_polled += records.len() as u64;

        debug!(
            source = %self.name,
            records = batch.num_rows(),
            "polled batch from Kafka"
        );
        Ok(Some(batch))
    }

    /// Stops the underlying reader. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Internal` if the reader task panicked.
    pub async fn close(&mut self) -> Result<(), ConnectorError> {
        if self.state == SourceState::Closed {
            return Ok(());
        }
        self.state = SourceState::Closed;
        info!(source = %self.name, records = self.records_polled, "closing Kafka source");
        self.stream.close().await
    }
}

impl fmt::Debug for BoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSource")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("max_poll_records", &self.max_poll_records)
            .field("records_polled", &self.records_polled)
            .finish_non_exhaustive()
    }
}
