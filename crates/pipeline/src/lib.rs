//! Sluice - Pipeline
//!
//! Runs one invocation: records from a source flow through a bounded queue,
//! the staged pipeline, and partitioned dispatch to a transport.
//!
//! # Architecture
//!
//! ```text
//! [RecordSource]                 [Pipeline]                              [Dispatch]
//!    feeder ──→ IngestionQueue ──→ PreFilter ──→ Deserialize ──→ Chain ──→ Serialize ──→ Buffer per PartitionKey ──→ send pool ──→ Transport
//!  (blocking)   (bounded mpsc)                                 (fork/cond                 (one mutex)                (Semaphore)
//!                                                                branch tasks)
//! ```
//!
//! # Key Design
//!
//! - **Backpressure**: the bounded queue is the only throttle between
//!   source and transport
//! - **Single consumer**: one task drains the stream; only the feeder, fork
//!   branches and sends run beside it
//! - **Fail fast at dispatch**: the first failed send rejects new work and
//!   `flush` raises one aggregated error
//! - **Join, not poll**: `flush` waits on a task tracker
//!
//! # Example
//!
//! ```ignore
//! use sluice_pipeline::Handler;
//!
//! let handler = Handler::from_config(&config)?;
//! let report = handler.process("app", Box::new(source)).await?;
//! println!("{} events dispatched", report.pipeline.dispatched);
//! ```

mod dispatch;
mod error;
mod handler;
mod metrics;
mod pipeline;
mod queue;
mod send;
pub mod stages;

pub use dispatch::DispatchService;
pub use error::{DispatchError, PipelineError, Result};
pub use handler::{
    ExceptionHook, Handler, HandlerBuilder, HookError, InvocationReport, NoopHook,
};
pub use metrics::{DispatchMetrics, DispatchStats, PipelineMetrics, PipelineStats};
pub use pipeline::Pipeline;
pub use queue::{Feeder, IngestionQueue, QueueStream, SourceHandle};
pub use stages::{DeserializerProcessor, PreFilter, SerializerProcessor};

pub use sluice_config::DEFAULT_QUEUE_SIZE;
