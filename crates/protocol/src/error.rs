//! Record source error types
//!
//! Errors raised while reading the records of an invocation.

use thiserror::Error;

/// Errors that can occur while pulling records from a source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying I/O failure
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be read or decoded
    #[error("failed to read record: {0}")]
    Read(String),

    /// Source was used after it was closed
    #[error("source is closed")]
    Closed,
}

impl SourceError {
    /// Create a read error
    #[inline]
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }
}
