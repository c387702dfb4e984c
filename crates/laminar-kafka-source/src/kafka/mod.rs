//! rdkafka-backed broker client adapter.
//!
//! Enabled by the `kafka` cargo feature. [`RdKafkaAdapter`] resolves the
//! topic selection against cluster metadata, assigns every partition
//! explicitly at its planned start offset and streams records from a
//! background task.

mod consumer;
mod context;

pub use consumer::{RdKafkaAdapter, DEFAULT_METADATA_TIMEOUT};
pub use context::{tracing_level, TracingConsumerContext};
