//! Null transport - discards every buffer
//!
//! Used for measuring pipeline throughput without I/O and for dry runs
//! against real configurations. Discarded buffers and events are counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sluice_config::{BufferConfig, TransportConfig};

use crate::{
    Buffer, LineBuffer, Result, Transport, TransportFactory, UnpartitionedTransport,
};

#[cfg(test)]
#[path = "null_test.rs"]
mod tests;

/// Counters for discarded data
#[derive(Debug, Default)]
pub struct NullMetrics {
    pub buffers_discarded: AtomicU64,
    pub events_discarded: AtomicU64,
}

impl NullMetrics {
    #[inline]
    fn record(&self, events: usize) {
        self.buffers_discarded.fetch_add(1, Ordering::Relaxed);
        self.events_discarded
            .fetch_add(events as u64, Ordering::Relaxed);
    }

    pub fn buffers(&self) -> u64 {
        self.buffers_discarded.load(Ordering::Relaxed)
    }

    pub fn events(&self) -> u64 {
        self.events_discarded.load(Ordering::Relaxed)
    }
}

/// Factory for [`NullTransport`]
#[derive(Debug, Clone)]
pub struct NullTransportFactory {
    buffer: BufferConfig,
    threads: usize,
    metrics: Arc<NullMetrics>,
}

impl NullTransportFactory {
    pub fn new(buffer: BufferConfig, threads: usize) -> Self {
        Self {
            buffer,
            threads: threads.max(1),
            metrics: Arc::new(NullMetrics::default()),
        }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Arc<dyn TransportFactory>> {
        Ok(Arc::new(Self::new(config.buffer.clone(), config.threads)))
    }

    /// Shared counters, valid after the factory is dropped
    pub fn metrics(&self) -> Arc<NullMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[async_trait]
impl TransportFactory for NullTransportFactory {
    fn new_instance(&self) -> Result<Transport> {
        Ok(Transport::Unpartitioned(Box::new(NullTransport {
            metrics: Arc::clone(&self.metrics),
        })))
    }

    fn new_buffer(&self) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(LineBuffer::from_config(&self.buffer)))
    }

    fn max_threads(&self) -> usize {
        self.threads
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

pub struct NullTransport {
    metrics: Arc<NullMetrics>,
}

#[async_trait]
impl UnpartitionedTransport for NullTransport {
    async fn send(&mut self, buffer: &dyn Buffer) -> Result<()> {
        self.metrics.record(buffer.len());
        Ok(())
    }
}
