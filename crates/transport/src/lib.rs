//! Sluice - Transport
//!
//! Buffers and transports that ship serialized events to their destination.
//!
//! # Architecture
//!
//! Dispatch keeps one live [`Buffer`] per partition key. When a buffer is
//! full (or at flush) it is handed to a send task, which asks the
//! [`TransportFactory`] for a fresh [`Transport`] and sends the closed
//! buffer through it.
//!
//! ```text
//! [Event] --add--> [Buffer per PartitionKey] --full/flush--> [Send task] --> [Transport] --> [Destination]
//! ```
//!
//! # Partitioned vs unpartitioned
//!
//! [`Transport`] is a tagged union resolved when the instance is created:
//! partitioned transports receive the buffer's partition key, unpartitioned
//! ones only the buffer.
//!
//! # Available Transports
//!
//! | Transport | Kind | Purpose |
//! |-----------|------|---------|
//! | `stdout` | unpartitioned | Debug output |
//! | `null` | unpartitioned | Discard (benchmarks, dry runs) |
//! | `file` | partitioned | One file per buffer under `<path>/<k=v>/` |
//! | `tcp` | unpartitioned | Newline-delimited stream to a remote host |
//! | `memory` | partitioned | In-process capture (code only, not configurable) |

mod buffer;
mod error;
pub mod file;
pub mod memory;
pub mod null;
pub mod registry;
pub mod stdout;
pub mod tcp;

use async_trait::async_trait;
use sluice_protocol::{Event, PartitionKey};

pub use buffer::LineBuffer;
pub use error::{BufferError, TransportError};
pub use file::FileTransportFactory;
pub use memory::{Delivery, MemoryTransportFactory};
pub use null::NullTransportFactory;
pub use stdout::StdoutTransportFactory;
pub use tcp::{TcpConfig, TcpTransportFactory};
pub use registry::{TransportConstructor, TransportRegistry, default_transports};

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Accumulates serialized events for one partition
///
/// A buffer is bound to one partition key for its whole life and is never
/// reused after it has been handed to a send task.
pub trait Buffer: Send + Sync {
    /// Append one serialized event
    ///
    /// # Errors
    /// - `BufferError::Full` when the event does not fit; the caller swaps
    ///   in a fresh buffer and retries once
    /// - Any other variant is a hard failure
    fn add(&mut self, event: &Event) -> std::result::Result<(), BufferError>;

    /// Number of events held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finalize the encoding (e.g. compress); called once before sending
    fn close(&mut self);

    /// Drop all content; called after the send attempt, successful or not
    fn clear(&mut self);

    /// Encoded content, as it will be sent
    fn contents(&self) -> &[u8];
}

/// Transport that ignores partitioning
#[async_trait]
pub trait UnpartitionedTransport: Send {
    async fn send(&mut self, buffer: &dyn Buffer) -> Result<()>;
}

/// Transport that routes by partition key
#[async_trait]
pub trait PartitionedTransport: Send {
    async fn send(&mut self, buffer: &dyn Buffer, partition: &PartitionKey) -> Result<()>;
}

/// A transport instance, tagged by whether it consumes the partition key
pub enum Transport {
    Partitioned(Box<dyn PartitionedTransport>),
    Unpartitioned(Box<dyn UnpartitionedTransport>),
}

impl Transport {
    /// Send one closed buffer through the variant's send operation
    pub async fn send(&mut self, buffer: &dyn Buffer, partition: &PartitionKey) -> Result<()> {
        match self {
            Self::Partitioned(transport) => transport.send(buffer, partition).await,
            Self::Unpartitioned(transport) => transport.send(buffer).await,
        }
    }

    #[inline]
    pub fn is_partitioned(&self) -> bool {
        matches!(self, Self::Partitioned(_))
    }
}

/// Creates transport instances and buffers for dispatch
///
/// One factory is shared by every send task of an invocation.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Create a transport instance for one send
    fn new_instance(&self) -> Result<Transport>;

    /// Create an empty buffer
    fn new_buffer(&self) -> Result<Box<dyn Buffer>>;

    /// Maximum number of concurrent sends
    fn max_threads(&self) -> usize;

    /// Cross-buffer cleanup, run after every flush
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Transport type name for logging
    fn name(&self) -> &'static str;
}
