//! Sluice - Transform
//!
//! Operations applied to events between deserialization and serialization.
//!
//! # Overview
//!
//! Operations come in four shapes, captured by [`Operation`]:
//! - **Event**: maps one event to zero or one event
//! - **Filter**: keeps an event iff its predicate holds
//! - **Fork**: copies every event into N branch chains and merges them
//! - **Conditional**: routes every event to the first branch whose
//!   condition holds
//!
//! Each operation is wrapped in an [`OperationProcessor`], which keeps
//! per-operation counters and applies the error policy. A [`Chain`] of
//! processors transforms an [`EventStream`] lazily.
//!
//! # Architecture
//!
//! ```text
//! [EventStream] → [Processor 1] → [Fork ─┬─ Chain A ─┐] → [Processor 3] → [EventStream']
//!                                         └─ Chain B ─┘
//! ```
//!
//! Errors travel down the stream as `Err` items; the final consumer aborts
//! on the first one.
//!
//! # Modules
//!
//! - `chain` - Sequential processor composition
//! - `processor` - Per-operation metrics and error policy
//! - `fork` / `conditional` - Task-per-branch stream stages
//! - `registry` - Config-driven operation creation
//! - `codec` - Deserializers and serializers
//! - `partition` - Partition key computation
//! - `noop`, `filter`, `fields`, `time` - Built-in operations
//!
//! # Example
//!
//! ```ignore
//! use sluice_transform::{default_registry, ChainBuilder};
//!
//! let registry = default_registry();
//! let chain = ChainBuilder::new(&registry, 1024).build(&source.operations)?;
//! let output = chain.apply(input);
//! ```

mod chain;
mod conditional;
mod error;
mod fork;
mod processor;
mod stream;
pub mod codec;
pub mod fields;
pub mod filter;
pub mod noop;
pub mod partition;
pub mod registry;
pub mod time;

use std::sync::Arc;

use sluice_protocol::Event;

pub use chain::Chain;
pub use codec::{CodecRegistry, Deserializer, Serializer, Wrapper, default_codecs};
pub use conditional::{Conditional, ConditionalBranch};
pub use error::TransformError;
pub use fork::Fork;
pub use partition::PartitionSpec;
pub use processor::{OperationMetrics, OperationMetricsSnapshot, OperationProcessor};
pub use registry::{ChainBuilder, OperationFactory, OperationRegistry, default_registry};
pub use stream::{EventStream, from_events};

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Operation mapping one event to zero or one event
///
/// Returning `Ok(None)` removes the event from the stream.
pub trait EventOperation: Send + Sync {
    fn perform(&self, event: Event) -> TransformResult<Option<Event>>;

    /// Name of this operation for logging and metrics
    fn name(&self) -> &'static str;
}

/// Predicate over events; the event is kept iff `test` returns `true`
pub trait FilterOperation: Send + Sync {
    fn test(&self, event: &Event) -> TransformResult<bool>;

    /// Name of this operation for logging and metrics
    fn name(&self) -> &'static str;
}

/// Tagged union of operation shapes
pub enum Operation {
    Event(Arc<dyn EventOperation>),
    Filter(Arc<dyn FilterOperation>),
    Fork(Fork),
    Conditional(Conditional),
}

impl Operation {
    /// Wrap an event operation
    pub fn event<O: EventOperation + 'static>(op: O) -> Self {
        Self::Event(Arc::new(op))
    }

    /// Wrap a filter operation
    pub fn filter<O: FilterOperation + 'static>(op: O) -> Self {
        Self::Filter(Arc::new(op))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Event(op) => op.name(),
            Self::Filter(op) => op.name(),
            Self::Fork(_) => "fork",
            Self::Conditional(_) => "conditional",
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Operation").field(&self.name()).finish()
    }
}
