//! Pipeline error types
//!
//! [`DispatchError`] covers the dispatch boundary; [`PipelineError`] is what
//! an invocation fails with.

use sluice_config::ConfigError;
use sluice_protocol::SourceError;
use sluice_transform::TransformError;
use sluice_transport::{BufferError, TransportError};
use thiserror::Error;

/// Errors raised by [`DispatchService`](crate::DispatchService)
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A send already failed; no new work is accepted
    #[error("dispatch rejected, a previous send failed: {0}")]
    Rejected(String),

    /// A single event does not fit into a brand-new buffer
    #[error("event does not fit into an empty buffer (partition '{partition}')")]
    EventTooLarge { partition: String },

    /// Buffer I/O failure
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// Transport factory failure outside a send
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// One or more sends failed during the invocation
    #[error("{failures} send(s) failed, first error: {first_error}")]
    Unrecoverable { failures: u64, first_error: String },
}

/// Invocation errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading the record source failed
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// An unsuppressed operation failed
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Dispatch or transport failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// No configured source matches the invocation's source name
    #[error("no source matches '{0}'")]
    NoMatchingSource(String),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured component could not be built
    #[error("failed to build {component}: {message}")]
    Build { component: String, message: String },
}

impl PipelineError {
    /// Create a build error for a named component
    pub fn build(component: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Build {
            component: component.into(),
            message: error.to_string(),
        }
    }

    /// Whether the error came from the dispatch boundary
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
