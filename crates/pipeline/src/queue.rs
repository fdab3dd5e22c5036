//! Ingestion Queue - bounded hand-off from the record source
//!
//! A feeder on the blocking pool pulls records from the source and offers
//! them to a bounded channel. `blocking_send` parks the feeder while the
//! channel is full; this is the only backpressure between a fast source
//! and a slow transport.
//!
//! ```text
//! [RecordSource] --next_record--> [Feeder (blocking pool)] --blocking_send--> [mpsc(capacity)] --> QueueStream
//! ```
//!
//! The feeder stops when the source is exhausted, when a read fails, or
//! when the consumer drops its end. In every case it drops the sender
//! (closing the queue once) and closes the source. A consumer that gives
//! up early calls [`Feeder::abandon`] instead of waiting on a feeder that
//! may be blocked inside a read.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sluice_protocol::{Event, Record, RecordSource, SourceError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::PipelineError;

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;

/// Lazy stream of queued events; ends when the queue is closed and drained
pub type QueueStream = ReceiverStream<Event>;

struct SourceInner {
    source: Mutex<Box<dyn RecordSource>>,
    closed: AtomicBool,
    released: AtomicBool,
}

/// Shared handle to the invocation's record source
///
/// Closing is idempotent and may happen from the feeder or from the
/// invocation wrapper, whichever comes first. `close` never waits for a
/// read in progress: it marks the handle closed and, if the reader holds
/// the source, the reader closes it as soon as its read returns.
#[derive(Clone)]
pub struct SourceHandle {
    inner: Arc<SourceInner>,
}

impl SourceHandle {
    pub fn new(source: Box<dyn RecordSource>) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                source: Mutex::new(source),
                closed: AtomicBool::new(false),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Next record, or `None` once exhausted or closed
    ///
    /// A record read while the handle was being closed is discarded.
    pub fn next_record(&self) -> Option<Result<Record, SourceError>> {
        let mut source = self.inner.source.lock();
        if self.is_closed() {
            self.release_logged(&mut **source);
            return None;
        }

        let next = source.next_record();
        if self.is_closed() {
            self.release_logged(&mut **source);
            return None;
        }
        next
    }

    /// Close the source; only the first release reaches it
    ///
    /// # Errors
    /// Returns the source's close error when the close happens here rather
    /// than being deferred to a reader
    pub fn close(&self) -> Result<(), SourceError> {
        self.inner.closed.store(true, Ordering::Release);
        match self.inner.source.try_lock() {
            Some(mut source) => self.release(&mut **source),
            None => {
                tracing::debug!("record source busy, close deferred to reader");
                Ok(())
            }
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn release(&self, source: &mut dyn RecordSource) -> Result<(), SourceError> {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        source.close()
    }

    fn release_logged(&self, source: &mut dyn RecordSource) {
        if let Err(e) = self.release(source) {
            tracing::warn!(error = %e, "failed to close record source");
        }
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Bounded queue fed from a record source
#[derive(Debug)]
pub struct IngestionQueue {
    receiver: mpsc::Receiver<Event>,
    feeder: Feeder,
}

impl IngestionQueue {
    /// Start feeding `source` into a queue of `capacity` events
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(source: SourceHandle, capacity: usize) -> Self {
        Self::start_with_metadata(source, capacity, Vec::new())
    }

    /// Like [`start`](Self::start), attaching `metadata` to every event
    pub fn start_with_metadata(
        source: SourceHandle,
        capacity: usize,
        metadata: Vec<(String, String)>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let feeding = source.clone();
        let handle = tokio::task::spawn_blocking(move || feed(feeding, sender, &metadata));
        Self {
            receiver,
            feeder: Feeder { handle, source },
        }
    }

    /// Separate the consumer stream from the feeder handle
    pub fn split(self) -> (QueueStream, Feeder) {
        (ReceiverStream::new(self.receiver), self.feeder)
    }
}

/// Handle to the feeder task
#[derive(Debug)]
pub struct Feeder {
    handle: JoinHandle<Result<u64, SourceError>>,
    source: SourceHandle,
}

impl Feeder {
    /// Wait for the feeder to stop
    ///
    /// Returns the number of records offered to the queue.
    ///
    /// # Errors
    /// Returns `PipelineError::Source` if reading the source failed
    pub async fn join(self) -> Result<u64, PipelineError> {
        match self.handle.await {
            Ok(result) => result.map_err(PipelineError::from),
            Err(e) => Err(SourceError::read(format!("feeder task failed: {e}")).into()),
        }
    }

    /// Stop without waiting: close the source and detach the feeder
    ///
    /// A feeder blocked in a read finishes in the background and closes
    /// the source when the read returns.
    pub fn abandon(self) {
        if let Err(e) = self.source.close() {
            tracing::warn!(error = %e, "failed to close record source");
        }
        tracing::debug!(finished = self.handle.is_finished(), "feeder abandoned");
    }
}

fn feed(
    source: SourceHandle,
    sender: mpsc::Sender<Event>,
    metadata: &[(String, String)],
) -> Result<u64, SourceError> {
    let mut fed = 0u64;

    let result = loop {
        match source.next_record() {
            None => break Ok(fed),
            Some(Err(e)) => break Err(e),
            Some(Ok(record)) => {
                let mut event = Event::from(record);
                for (key, value) in metadata {
                    event.insert_metadata(key.as_str(), value.as_str());
                }
                if sender.blocking_send(event).is_err() {
                    tracing::debug!(fed, "queue closed by consumer, feeder stopping");
                    break Ok(fed);
                }
                fed += 1;
            }
        }
    };

    drop(sender);
    if let Err(e) = source.close() {
        tracing::warn!(error = %e, "failed to close record source");
    }

    match &result {
        Ok(fed) => tracing::debug!(fed, "feeder finished"),
        Err(e) => tracing::error!(fed, error = %e, "record source failed"),
    }
    result
}
