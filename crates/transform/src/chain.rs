//! Operation Chain - Sequential stream transformation
//!
//! The `Chain` applies its processors in order to an event stream.
//!
//! # Design
//!
//! - **Lazy**: `apply` only composes stream adapters; work happens as the
//!   consumer pulls
//! - **Sequential**: Each processor receives the output of the previous one
//! - **Fail-fast**: An unsuppressed error travels to the consumer, which
//!   stops pulling
//! - **Reusable**: A chain holds no per-invocation state and can be applied
//!   any number of times

use crate::{EventStream, OperationProcessor};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Ordered list of operation processors
#[derive(Debug, Default)]
pub struct Chain {
    processors: Vec<OperationProcessor>,
}

impl Chain {
    pub fn new(processors: Vec<OperationProcessor>) -> Self {
        Self { processors }
    }

    /// Create an empty chain (identity)
    pub fn empty() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Names of all processors, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    #[inline]
    pub fn processors(&self) -> &[OperationProcessor] {
        &self.processors
    }

    /// First processor with the given operation name
    pub fn get(&self, name: &str) -> Option<&OperationProcessor> {
        self.processors.iter().find(|p| p.name() == name)
    }

    /// Compose every processor over `input`
    ///
    /// Must be called from within a Tokio runtime when the chain contains a
    /// fork or conditional stage, since those spawn their branch tasks here.
    pub fn apply(&self, input: EventStream) -> EventStream {
        self.processors
            .iter()
            .fold(input, |stream, processor| processor.apply(stream))
    }
}
