//! Transform error types
//!
//! Errors raised while building or running operations and codecs.

use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors that can occur during transformation
#[derive(Debug, Error)]
pub enum TransformError {
    /// Operation logic failed
    #[error("operation failed: {0}")]
    Failed(String),

    /// An operation in a chain failed; carries the operation name
    #[error("operation '{operation}' failed: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<TransformError>,
    },

    /// Raw record could not be deserialized
    #[error("failed to deserialize record: {0}")]
    Deserialize(String),

    /// Payload could not be serialized
    #[error("failed to serialize payload: {0}")]
    Serialize(String),

    /// A required payload field is absent
    #[error("field '{0}' not found")]
    FieldNotFound(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A fork or conditional branch task terminated abnormally
    #[error("branch task failed: {0}")]
    Branch(String),
}

impl TransformError {
    /// Create an operation failed error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Attribute an error to a named operation
    pub fn operation(operation: &'static str, source: TransformError) -> Self {
        Self::Operation {
            operation,
            source: Box::new(source),
        }
    }

    /// Create a deserialize error
    pub fn deserialize(msg: impl Into<String>) -> Self {
        Self::Deserialize(msg.into())
    }

    /// Create a serialize error
    pub fn serialize(msg: impl Into<String>) -> Self {
        Self::Serialize(msg.into())
    }

    /// Create a field-not-found error
    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound(field.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
