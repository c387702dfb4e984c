//! Connector error types.
//!
//! [`ConnectorError`] covers every failure the Kafka source can surface,
//! from option resolution through to draining the record stream.

use thiserror::Error;

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors produced by the Kafka source connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Options are contradictory, incomplete or carry an invalid value.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// `startTime` does not match `yyyy-MM-dd HH:mm:ss`.
    #[error("failed to parse start time '{input}': {reason}")]
    TimestampParse {
        /// The text exactly as supplied.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The broker client could not be created, queried or assigned.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Reading from the record stream failed.
    #[error("read error: {0}")]
    ReadError(String),

    /// An operation was attempted in the wrong lifecycle state.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// The state the operation requires.
        expected: String,
        /// The state the source was actually in.
        actual: String,
    },

    /// Arrow rejected a batch built from broker records.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConnectorError {
    /// Creates a [`ConnectorError::ConfigurationError`].
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Creates a [`ConnectorError::TimestampParse`] for `input`.
    #[must_use]
    pub fn timestamp(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TimestampParse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the same call could succeed.
    ///
    /// Configuration and parse errors are a pure function of the options,
    /// so only broker connectivity failures qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }
}
