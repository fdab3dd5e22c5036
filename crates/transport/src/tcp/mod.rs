//! TCP transport - length-prefixed frames to a remote host
//!
//! Each buffer is sent as a single frame on a fresh connection:
//!
//! ```text
//! [4 bytes: length (big-endian)][N bytes: buffer contents]
//! ```
//!
//! Connect and write are bounded by timeouts. A failed attempt is retried
//! on a new connection up to `retry_attempts` times, `retry_interval`
//! apart; after that the send fails with `RetriesExhausted`.
//!
//! ```toml
//! [transport]
//! type = "tcp"
//! target = "collector.internal:7070"
//! connection_timeout_ms = 10000
//! write_timeout_ms = 5000
//! retry_attempts = 3
//! retry_interval_ms = 1000
//! ```

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sluice_config::{BufferConfig, ComponentOptions, TransportConfig};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::{
    Buffer, LineBuffer, Result, Transport, TransportError, TransportFactory,
    UnpartitionedTransport,
};

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tests;

/// Connection and retry settings
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Target address (host:port)
    pub target: String,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Write timeout per frame
    pub write_timeout: Duration,

    /// Number of attempts per buffer
    pub retry_attempts: usize,

    /// Wait time between attempts
    pub retry_interval: Duration,
}

impl TcpConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            connection_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_interval: Duration::from_secs(1),
        }
    }

    /// Set connection timeout
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set write timeout
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set retry attempts (at least one attempt is always made)
    #[must_use]
    pub fn with_retry_attempts(mut self, attempts: usize) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Set retry interval
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Read `target` and the optional timing options
    ///
    /// # Errors
    /// Returns `TransportError::Config` when `target` is missing or a
    /// numeric option is negative
    pub fn from_options(config: &TransportConfig) -> Result<Self> {
        let target = config
            .get_str("target")
            .ok_or_else(|| TransportError::config("tcp transport requires 'target'"))?;

        let mut tcp = Self::new(target);
        if let Some(ms) = millis(config, "connection_timeout_ms")? {
            tcp = tcp.with_connection_timeout(ms);
        }
        if let Some(ms) = millis(config, "write_timeout_ms")? {
            tcp = tcp.with_write_timeout(ms);
        }
        if let Some(ms) = millis(config, "retry_interval_ms")? {
            tcp = tcp.with_retry_interval(ms);
        }
        if let Some(attempts) = config.get_int("retry_attempts") {
            let attempts = usize::try_from(attempts)
                .map_err(|_| TransportError::config("'retry_attempts' must not be negative"))?;
            tcp = tcp.with_retry_attempts(attempts);
        }
        Ok(tcp)
    }
}

fn millis(config: &TransportConfig, key: &str) -> Result<Option<Duration>> {
    config
        .get_int(key)
        .map(|v| {
            u64::try_from(v)
                .map(Duration::from_millis)
                .map_err(|_| TransportError::config(format!("'{key}' must not be negative")))
        })
        .transpose()
}

/// Factory for [`TcpTransport`]
#[derive(Debug, Clone)]
pub struct TcpTransportFactory {
    config: Arc<TcpConfig>,
    buffer: BufferConfig,
    threads: usize,
}

impl TcpTransportFactory {
    pub fn new(config: TcpConfig, buffer: BufferConfig, threads: usize) -> Self {
        Self {
            config: Arc::new(config),
            buffer,
            threads: threads.max(1),
        }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Arc<dyn TransportFactory>> {
        let tcp = TcpConfig::from_options(config)?;
        Ok(Arc::new(Self::new(tcp, config.buffer.clone(), config.threads)))
    }
}

#[async_trait]
impl TransportFactory for TcpTransportFactory {
    fn new_instance(&self) -> Result<Transport> {
        Ok(Transport::Unpartitioned(Box::new(TcpTransport {
            config: Arc::clone(&self.config),
        })))
    }

    fn new_buffer(&self) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(LineBuffer::from_config(&self.buffer)))
    }

    fn max_threads(&self) -> usize {
        self.threads
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

/// Sends one buffer as one frame
pub struct TcpTransport {
    config: Arc<TcpConfig>,
}

impl TcpTransport {
    async fn connect(&self) -> Result<TcpStream> {
        let stream = match timeout(
            self.config.connection_timeout,
            TcpStream::connect(&self.config.target),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TransportError::ConnectionFailed {
                    target: self.config.target.clone(),
                    source: e,
                });
            }
            Err(_) => {
                return Err(TransportError::ConnectionFailed {
                    target: self.config.target.clone(),
                    source: std::io::Error::new(ErrorKind::TimedOut, "connection timed out"),
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(
                target_addr = %self.config.target,
                error = %e,
                "failed to set TCP_NODELAY, continuing with default buffering"
            );
        }
        Ok(stream)
    }

    async fn send_frame(&self, frame: &[u8]) -> Result<()> {
        let len = u32::try_from(frame.len())
            .map_err(|_| TransportError::send("buffer exceeds maximum frame size"))?;
        let mut stream = self.connect().await?;

        let write_result = timeout(self.config.write_timeout, async {
            stream.write_all(&len.to_be_bytes()).await?;
            stream.write_all(frame).await?;
            stream.flush().await?;
            stream.shutdown().await?;
            Ok::<(), std::io::Error>(())
        })
        .await;

        match write_result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[async_trait]
impl UnpartitionedTransport for TcpTransport {
    async fn send(&mut self, buffer: &dyn Buffer) -> Result<()> {
        let mut last_error = String::new();

        for attempt in 0..self.config.retry_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_interval).await;
            }

            match self.send_frame(buffer.contents()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_error = e.to_string();
                    tracing::debug!(
                        target_addr = %self.config.target,
                        attempt = attempt + 1,
                        max_attempts = self.config.retry_attempts,
                        error = %e,
                        "send attempt failed"
                    );
                }
            }
        }

        Err(TransportError::RetriesExhausted {
            attempts: self.config.retry_attempts,
            last_error,
        })
    }
}
