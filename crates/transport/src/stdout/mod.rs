//! Stdout transport - writes buffers to standard output
//!
//! Intended for debugging and for piping the pipeline into other tools.
//! Sends are serialized through a shared lock so concurrent buffers never
//! interleave.
//!
//! ```toml
//! [transport]
//! type = "stdout"
//! threads = 1
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use sluice_config::{BufferConfig, TransportConfig};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{
    Buffer, LineBuffer, Result, Transport, TransportFactory, UnpartitionedTransport,
};

#[cfg(test)]
#[path = "stdout_test.rs"]
mod tests;

/// Factory for [`StdoutTransport`]
#[derive(Debug, Clone)]
pub struct StdoutTransportFactory {
    buffer: BufferConfig,
    threads: usize,
    lock: Arc<Mutex<()>>,
}

impl StdoutTransportFactory {
    pub fn new(buffer: BufferConfig, threads: usize) -> Self {
        Self {
            buffer,
            threads: threads.max(1),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Arc<dyn TransportFactory>> {
        Ok(Arc::new(Self::new(config.buffer.clone(), config.threads)))
    }
}

#[async_trait]
impl TransportFactory for StdoutTransportFactory {
    fn new_instance(&self) -> Result<Transport> {
        Ok(Transport::Unpartitioned(Box::new(StdoutTransport {
            lock: Arc::clone(&self.lock),
        })))
    }

    fn new_buffer(&self) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(LineBuffer::from_config(&self.buffer)))
    }

    fn max_threads(&self) -> usize {
        self.threads
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// Writes each buffer's contents to stdout
pub struct StdoutTransport {
    lock: Arc<Mutex<()>>,
}

#[async_trait]
impl UnpartitionedTransport for StdoutTransport {
    async fn send(&mut self, buffer: &dyn Buffer) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(buffer.contents()).await?;
        stdout.flush().await?;
        Ok(())
    }
}
