//! Buffer and transport error types

use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors returned by [`Buffer::add`](crate::Buffer::add)
#[derive(Debug, Error)]
pub enum BufferError {
    /// Capacity reached; not a failure on its own
    #[error("buffer is full")]
    Full,

    /// The event has not been serialized
    #[error("event has no serialized form")]
    Unserialized,

    /// Buffer was closed and can no longer accept events
    #[error("buffer is closed")]
    Closed,

    /// I/O error while encoding
    #[error("buffer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by transports and transport factories
#[derive(Debug, Error)]
pub enum TransportError {
    /// Invalid configuration
    #[error("invalid transport configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection failed
    #[error("connection failed to {target}: {source}")]
    ConnectionFailed {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Timeout
    #[error("operation timed out")]
    Timeout,

    /// All retry attempts exhausted
    #[error("all {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    /// Destination rejected the send
    #[error("send failed: {0}")]
    Send(String),
}

impl TransportError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a send error
    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }
}
