//! Operation processor - metrics and error policy around one operation
//!
//! Every operation in a chain is wrapped in an `OperationProcessor`. The
//! processor counts successes, errors and filter drops, measures runtime,
//! and decides what an operation error means:
//!
//! - **Fatal** (default): the error is attributed to the operation and
//!   sent down the stream, aborting the invocation
//! - **Suppressed**: the event is dropped, the error is counted and logged
//!
//! Fork and conditional stages are stream-shaped; their processor counts the
//! events they emit. Their branch operations keep their own processors.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures_util::{StreamExt, future};

use crate::{EventStream, Operation, TransformError};

#[cfg(test)]
#[path = "processor_test.rs"]
mod tests;

/// Counters for one operation
///
/// All counters use relaxed ordering; values are eventually consistent.
#[derive(Debug, Default)]
pub struct OperationMetrics {
    /// Events the operation handled without error
    success: AtomicU64,

    /// Operation errors (fatal or suppressed)
    errors: AtomicU64,

    /// Events removed (event operation returned none, or filter rejected)
    dropped: AtomicU64,

    /// Total time spent inside the operation in nanoseconds
    duration_ns: AtomicU64,
}

impl OperationMetrics {
    pub const fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            duration_ns: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_success(&self, duration: Duration) {
        self.success.fetch_add(1, Ordering::Relaxed);
        self.duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OperationMetricsSnapshot {
        OperationMetricsSnapshot {
            success: self.success.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            duration_ns: self.duration_ns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`OperationMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationMetricsSnapshot {
    pub success: u64,
    pub errors: u64,
    pub dropped: u64,
    pub duration_ns: u64,
}

/// One operation plus its metrics and error policy
pub struct OperationProcessor {
    operation: Operation,
    suppress_errors: bool,
    metrics: Arc<OperationMetrics>,
}

impl OperationProcessor {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            suppress_errors: false,
            metrics: Arc::new(OperationMetrics::new()),
        }
    }

    /// Drop events whose operation errors instead of aborting
    #[must_use]
    pub fn with_suppress_errors(mut self, suppress: bool) -> Self {
        self.suppress_errors = suppress;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.operation.name()
    }

    #[inline]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    #[inline]
    pub fn metrics(&self) -> &OperationMetrics {
        &self.metrics
    }

    #[inline]
    pub fn suppresses_errors(&self) -> bool {
        self.suppress_errors
    }

    /// Apply the operation to a stream, lazily
    ///
    /// Upstream errors pass through untouched.
    pub fn apply(&self, input: EventStream) -> EventStream {
        let metrics = Arc::clone(&self.metrics);
        let suppress = self.suppress_errors;
        let name = self.name();

        match &self.operation {
            Operation::Event(op) => {
                let op = Arc::clone(op);
                input
                    .filter_map(move |item| {
                        let out = match item {
                            Err(e) => Some(Err(e)),
                            Ok(event) => {
                                let start = Instant::now();
                                match op.perform(event) {
                                    Ok(Some(event)) => {
                                        metrics.record_success(start.elapsed());
                                        Some(Ok(event))
                                    }
                                    Ok(None) => {
                                        metrics.record_success(start.elapsed());
                                        metrics.record_dropped();
                                        None
                                    }
                                    Err(e) => on_error(&metrics, name, suppress, e),
                                }
                            }
                        };
                        future::ready(out)
                    })
                    .boxed()
            }
            Operation::Filter(op) => {
                let op = Arc::clone(op);
                input
                    .filter_map(move |item| {
                        let out = match item {
                            Err(e) => Some(Err(e)),
                            Ok(event) => {
                                let start = Instant::now();
                                match op.test(&event) {
                                    Ok(true) => {
                                        metrics.record_success(start.elapsed());
                                        Some(Ok(event))
                                    }
                                    Ok(false) => {
                                        metrics.record_success(start.elapsed());
                                        metrics.record_dropped();
                                        None
                                    }
                                    Err(e) => on_error(&metrics, name, suppress, e),
                                }
                            }
                        };
                        future::ready(out)
                    })
                    .boxed()
            }
            Operation::Fork(fork) => count_stream(fork.apply(input), metrics),
            Operation::Conditional(conditional) => {
                count_stream(conditional.apply(input), metrics)
            }
        }
    }
}

impl std::fmt::Debug for OperationProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationProcessor")
            .field("operation", &self.name())
            .field("suppress_errors", &self.suppress_errors)
            .finish()
    }
}

fn on_error<T>(
    metrics: &OperationMetrics,
    name: &'static str,
    suppress: bool,
    error: TransformError,
) -> Option<Result<T, TransformError>> {
    metrics.record_error();
    if suppress {
        tracing::warn!(operation = name, error = %error, "operation failed, dropping event");
        None
    } else {
        Some(Err(TransformError::operation(name, error)))
    }
}

/// Count the events a stream-shaped stage emits
fn count_stream(output: EventStream, metrics: Arc<OperationMetrics>) -> EventStream {
    output
        .inspect(move |item| {
            if item.is_ok() {
                metrics.record_success(Duration::ZERO);
            }
        })
        .boxed()
}
