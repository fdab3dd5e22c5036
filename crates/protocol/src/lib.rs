//! Sluice Protocol - Core types that flow through the pipeline
//!
//! This crate provides the data model shared by every stage:
//! - `Record` - One raw record pulled from a triggering source
//! - `Event` - The unit moved through filter, operate, serialize and dispatch
//! - `Payload` - Deserialized event body (text or JSON document)
//! - `PartitionKey` - Ordered set of named values that selects a buffer
//! - `RecordSource` - Pull interface over the records of one invocation
//!
//! # Design Principles
//!
//! - **Owned events**: Each event is owned by exactly one stage at a time
//! - **Explicit copies**: Fork fan-out goes through `Event::fork_copy`
//! - **Structural keys**: Partition keys compare by content and order

mod error;
mod event;
mod partition;
mod record;

pub use error::SourceError;
pub use event::{Event, Payload};
pub use partition::PartitionKey;
pub use record::{IterSource, ReaderSource, Record, RecordSource, now_millis};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for record source operations
pub type Result<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod partition_test;
