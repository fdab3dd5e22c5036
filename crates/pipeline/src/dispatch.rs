//! Dispatch Service - partitioned buffering with a bounded send pool
//!
//! Keeps at most one live buffer per partition key. A full buffer is
//! swapped for a fresh one and handed to a send task; `flush` hands off the
//! rest and waits for every task.
//!
//! # Failure model
//!
//! The first failed send sets an invocation-wide flag. From then on `add`
//! rejects new events and queued sends skip their buffers, while sends
//! already running finish naturally. `flush` reports every failure as one
//! [`DispatchError::Unrecoverable`]. No retry happens here; retries belong
//! to the transport.
//!
//! ```text
//! add(event) --> [table: PartitionKey -> Buffer] --full--> submit --> [Semaphore(max_threads)] --> send task
//!                                                 flush --> submit all --> TaskTracker::wait
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use sluice_protocol::{Event, PartitionKey};
use sluice_transport::{Buffer, BufferError, TransportFactory};
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::send::SendTask;
use crate::{DispatchError, DispatchMetrics, DispatchStats};

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;

/// State shared between the service and its send tasks
#[derive(Debug, Default)]
pub(crate) struct DispatchState {
    failed: AtomicBool,
    failures: AtomicU64,
    first_error: Mutex<Option<String>>,
    outstanding: AtomicUsize,
    pub(crate) metrics: DispatchMetrics,
}

impl DispatchState {
    #[inline]
    pub(crate) fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Set the unrecoverable flag, keeping the first message
    pub(crate) fn record_failure(&self, error: &dyn std::fmt::Display) {
        self.failures.fetch_add(1, Ordering::AcqRel);
        {
            let mut first = self.first_error.lock();
            if first.is_none() {
                *first = Some(error.to_string());
            }
        }
        self.failed.store(true, Ordering::Release);
    }

    fn first_error(&self) -> String {
        self.first_error
            .lock()
            .clone()
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// Clear the flag and turn the recorded failures into one error
    fn take_failure(&self) -> Option<DispatchError> {
        if !self.failed.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(DispatchError::Unrecoverable {
            failures: self.failures.swap(0, Ordering::AcqRel),
            first_error: self
                .first_error
                .lock()
                .take()
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    #[inline]
    pub(crate) fn begin_send(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn end_send(&self) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-invocation dispatch of serialized events to a transport
pub struct DispatchService {
    factory: Arc<dyn TransportFactory>,
    table: Mutex<HashMap<PartitionKey, Box<dyn Buffer>>>,
    state: Arc<DispatchState>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl DispatchService {
    /// Create a service with a send pool of `factory.max_threads()`
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        let threads = factory.max_threads().max(1);
        Self {
            factory,
            table: Mutex::new(HashMap::new()),
            state: Arc::new(DispatchState::default()),
            permits: Arc::new(Semaphore::new(threads)),
            tracker: TaskTracker::new(),
        }
    }

    /// Buffer one serialized event under its partition key
    ///
    /// Must be called from within a Tokio runtime; a full buffer is handed
    /// to a spawned send task.
    ///
    /// # Errors
    /// - `DispatchError::Rejected` once any send has failed
    /// - `DispatchError::EventTooLarge` if the event does not fit an empty
    ///   buffer
    /// - `DispatchError::Buffer` / `DispatchError::Transport` on buffer or
    ///   factory failure
    pub fn add(&self, event: &Event) -> Result<(), DispatchError> {
        if self.state.is_failed() {
            return Err(DispatchError::Rejected(self.state.first_error()));
        }

        let key = event.partition();
        let mut table = self.table.lock();
        let buffer = match table.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.factory.new_buffer()?),
        };

        match buffer.add(event) {
            Ok(()) => {}
            Err(BufferError::Full) => {
                let full = std::mem::replace(buffer, self.factory.new_buffer()?);
                self.submit(key.clone(), full);
                match buffer.add(event) {
                    Ok(()) => {}
                    Err(BufferError::Full) => {
                        return Err(DispatchError::EventTooLarge {
                            partition: key.to_string(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        self.state.metrics.record_added();
        Ok(())
    }

    /// Hand off every remaining buffer and wait for all sends
    ///
    /// Runs the factory's `close` hook afterwards. The wait has no timeout;
    /// transports bound their own I/O.
    ///
    /// # Errors
    /// Returns one `DispatchError::Unrecoverable` if any send (or the close
    /// hook) failed since the last flush
    pub async fn flush(&self) -> Result<(), DispatchError> {
        let drained: Vec<(PartitionKey, Box<dyn Buffer>)> = self.table.lock().drain().collect();
        for (partition, buffer) in drained {
            self.submit(partition, buffer);
        }

        self.wait_for_sends().await;

        if let Err(e) = self.factory.close().await {
            tracing::error!(
                transport = self.factory.name(),
                error = %e,
                "transport close failed"
            );
            self.state.metrics.record_failed();
            self.state.record_failure(&e);
        }

        match self.state.take_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Best-effort flush, then release the send pool
    ///
    /// Flush errors are logged, not returned.
    pub async fn shutdown(&self) {
        if let Err(e) = self.flush().await {
            tracing::error!(
                transport = self.factory.name(),
                error = %e,
                "flush during shutdown failed"
            );
        }
        self.release();
    }

    /// Release the send pool without flushing
    ///
    /// Sends still waiting for a permit skip their buffers.
    pub fn release(&self) {
        self.permits.close();
        self.tracker.close();
    }

    /// Wait until every submitted send has finished
    pub async fn wait_for_sends(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if !self.permits.is_closed() {
            self.tracker.reopen();
        }
    }

    /// Sends submitted but not yet finished
    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::Acquire)
    }

    /// Whether a send has failed since the last flush
    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }

    /// Number of partitions with a live buffer
    pub fn live_buffers(&self) -> usize {
        self.table.lock().len()
    }

    pub fn stats(&self) -> DispatchStats {
        self.state.metrics.snapshot()
    }

    /// Spawn a send task for a buffer; empty buffers are dropped
    fn submit(&self, partition: PartitionKey, buffer: Box<dyn Buffer>) {
        if buffer.is_empty() {
            return;
        }
        self.state.metrics.record_submitted();

        let task = SendTask::new(
            Arc::clone(&self.factory),
            Arc::clone(&self.state),
            partition,
            buffer,
        );
        self.tracker.spawn(task.run(Arc::clone(&self.permits)));
    }
}

impl std::fmt::Debug for DispatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchService")
            .field("transport", &self.factory.name())
            .field("live_buffers", &self.live_buffers())
            .field("outstanding", &self.outstanding())
            .field("failed", &self.is_failed())
            .finish()
    }
}
