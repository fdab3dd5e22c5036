//! Memory transport - captures buffers in process
//!
//! Not configurable from TOML; construct it in code when embedding the
//! pipeline or in tests. Every delivered buffer is kept as a [`Delivery`].
//! Failures and latency can be injected to exercise dispatch error paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sluice_config::BufferConfig;
use sluice_protocol::PartitionKey;

use crate::{
    Buffer, LineBuffer, PartitionedTransport, Result, Transport, TransportError, TransportFactory,
};

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

/// One delivered buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub partition: PartitionKey,
    pub events: usize,
    pub contents: Bytes,
}

impl Delivery {
    /// Contents split into lines (uncompressed buffers only)
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.contents)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    deliveries: Mutex<Vec<Delivery>>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    closes: AtomicUsize,
}

/// Factory for [`MemoryTransport`]
///
/// Clones share the captured state.
#[derive(Debug, Clone)]
pub struct MemoryTransportFactory {
    state: Arc<MemoryState>,
    buffer: BufferConfig,
    threads: usize,
    delay: Option<Duration>,
    failing: Option<PartitionKey>,
}

impl MemoryTransportFactory {
    pub fn new(buffer: BufferConfig, threads: usize) -> Self {
        Self {
            state: Arc::new(MemoryState::default()),
            buffer,
            threads: threads.max(1),
            delay: None,
            failing: None,
        }
    }

    /// Fail the first `count` sends
    #[must_use]
    pub fn with_send_failures(self, count: usize) -> Self {
        self.state.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Fail every send for one partition key
    #[must_use]
    pub fn with_failing_partition(mut self, partition: PartitionKey) -> Self {
        self.failing = Some(partition);
        self
    }

    /// Sleep inside every send
    #[must_use]
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Successfully delivered buffers, in completion order
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.state.deliveries.lock().clone()
    }

    /// Every delivered line across all buffers
    pub fn lines(&self) -> Vec<String> {
        self.state
            .deliveries
            .lock()
            .iter()
            .flat_map(Delivery::lines)
            .collect()
    }

    /// Send attempts, including failed ones
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of sends observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of factory `close` calls
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportFactory for MemoryTransportFactory {
    fn new_instance(&self) -> Result<Transport> {
        Ok(Transport::Partitioned(Box::new(MemoryTransport {
            state: Arc::clone(&self.state),
            delay: self.delay,
            failing: self.failing.clone(),
        })))
    }

    fn new_buffer(&self) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(LineBuffer::from_config(&self.buffer)))
    }

    fn max_threads(&self) -> usize {
        self.threads
    }

    async fn close(&self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

pub struct MemoryTransport {
    state: Arc<MemoryState>,
    delay: Option<Duration>,
    failing: Option<PartitionKey>,
}

#[async_trait]
impl PartitionedTransport for MemoryTransport {
    async fn send(&mut self, buffer: &dyn Buffer, partition: &PartitionKey) -> Result<()> {
        let state = &self.state;
        state.attempts.fetch_add(1, Ordering::SeqCst);
        let running = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failed = self.failing.as_ref() == Some(partition)
            || state
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

        let result = if failed {
            Err(TransportError::send("injected failure"))
        } else {
            state.deliveries.lock().push(Delivery {
                partition: partition.clone(),
                events: buffer.len(),
                contents: Bytes::copy_from_slice(buffer.contents()),
            });
            Ok(())
        };

        state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
