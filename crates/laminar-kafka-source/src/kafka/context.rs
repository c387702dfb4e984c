//! rdkafka client context that forwards librdkafka logs to `tracing`.

use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::ConsumerContext;
use rdkafka::error::KafkaError;
use rdkafka::ClientContext;
use tracing::{debug, error, info, warn, Level};

/// Consumer context routing librdkafka log lines and errors to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsumerContext;

/// Maps a librdkafka syslog-style level onto a `tracing` level.
#[must_use]
pub fn tracing_level(level: RDKafkaLogLevel) -> Level {
    match level {
        RDKafkaLogLevel::Emerg
        | RDKafkaLogLevel::Alert
        | RDKafkaLogLevel::Critical
        | RDKafkaLogLevel::Error => Level::ERROR,
        RDKafkaLogLevel::Warning => Level::WARN,
        RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => Level::INFO,
        RDKafkaLogLevel::Debug => Level::DEBUG,
    }
}

impl ClientContext for TracingConsumerContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match tracing_level(level) {
            Level::ERROR => error!(target: "librdkafka", facility = %fac, "{log_message}"),
            Level::WARN => warn!(target: "librdkafka", facility = %fac, "{log_message}"),
            Level::INFO => info!(target: "librdkafka", facility = %fac, "{log_message}"),
            _ => debug!(target: "librdkafka", facility = %fac, "{log_message}"),
        }
    }

    fn error(&self, error: KafkaError, reason: &str) {
        error!(target: "librdkafka", error = %error, reason = %reason, "kafka client error");
    }
}

impl ConsumerContext for TracingConsumerContext {}
