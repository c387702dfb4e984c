//! Broker client adapter seam.
//!
//! A [`BrokerClientAdapter`] takes a finished [`ConnectorConfiguration`],
//! connects to the broker and hands back a [`RecordStream`]. The stream is
//! the receiving half of a bounded channel fed by a background reader task.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::builder::ConnectorConfiguration;
use crate::error::ConnectorError;
use crate::schema::BrokerRecord;

/// Default capacity of the channel between reader task and stream.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Produces raw records for a resolved configuration.
#[async_trait]
pub trait BrokerClientAdapter: Send + Sync {
    /// Connects, positions every assigned partition according to the
    /// startup policy and starts reading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for an unsupported startup mode or an
    /// unresolvable topic selection, and `ConnectionFailed` if the broker
    /// cannot be reached or the assignment is rejected.
    async fn open(&self, config: ConnectorConfiguration) -> Result<RecordStream, ConnectorError>;
}

/// Receiving side of an adapter's record channel.
///
/// Dropping the stream signals the reader task to stop.
#[derive(Debug)]
pub struct RecordStream {
    receiver: mpsc::Receiver<BrokerRecord>,
    shutdown: Option<watch::Sender<bool>>,
    reader: Option<JoinHandle<()>>,
    exhausted: bool,
}

impl RecordStream {
    /// Creates a bounded channel and returns its sender with the stream.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<BrokerRecord>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    /// Wraps a receiver with no reader task attached.
    #[must_use]
    pub fn new(receiver: mpsc::Receiver<BrokerRecord>) -> Self {
        Self {
            receiver,
            shutdown: None,
            reader: None,
            exhausted: false,
        }
    }

    /// Wraps a receiver fed by `reader`, stopped through `shutdown`.
    #[must_use]
    pub fn with_reader(
        receiver: mpsc::Receiver<BrokerRecord>,
        shutdown: watch::Sender<bool>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            shutdown: Some(shutdown),
            reader: Some(reader),
            exhausted: false,
        }
    }

    /// Returns the next buffered record without waiting.
    ///
    /// Returns `None` when nothing is buffered or the producer is gone; use
    /// [`RecordStream::is_exhausted`] to tell the two apart.
    pub fn try_next(&mut self) -> Option<BrokerRecord> {
        match self.receiver.try_recv() {
            Ok(rec) => Some(rec),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.exhausted = true;
                None
            }
        }
    }

    /// Waits for the next record. `None` once the producer is gone and
    /// the buffer is drained.
    pub async fn recv(&mut self) -> Option<BrokerRecord> {
        let rec = self.receiver.recv().await;
        if rec.is_none() {
            self.exhausted = true;
        }
        rec
    }

    /// Returns `true` once the producer has gone away and every buffered
    /// record has been taken.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Stops the reader task and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Internal` if the reader task panicked.
    pub async fn close(&mut self) -> Result<(), ConnectorError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        self.receiver.close();
        if let Some(handle) = self.reader.take() {
            handle
                .await
                .map_err(|e| ConnectorError::Internal(format!("reader task failed: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
    }
}
