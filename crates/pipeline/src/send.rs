//! Send task - ships one buffer through a fresh transport
//!
//! Lifecycle of one task:
//! 1. wait for a pool permit
//! 2. skip if the invocation already failed
//! 3. create a transport, close the buffer, send
//! 4. record success, or set the unrecoverable flag
//!
//! Clearing the buffer and releasing the outstanding count happen on drop,
//! so they also run if the transport panics.

use std::sync::Arc;

use sluice_protocol::PartitionKey;
use sluice_transport::{Buffer, TransportError, TransportFactory};
use tokio::sync::Semaphore;

use crate::dispatch::DispatchState;

pub(crate) struct SendTask {
    factory: Arc<dyn TransportFactory>,
    state: Arc<DispatchState>,
    partition: PartitionKey,
    buffer: Box<dyn Buffer>,
    finished: bool,
}

impl SendTask {
    pub(crate) fn new(
        factory: Arc<dyn TransportFactory>,
        state: Arc<DispatchState>,
        partition: PartitionKey,
        buffer: Box<dyn Buffer>,
    ) -> Self {
        state.begin_send();
        Self {
            factory,
            state,
            partition,
            buffer,
            finished: false,
        }
    }

    pub(crate) async fn run(mut self, permits: Arc<Semaphore>) {
        let Ok(_permit) = permits.acquire_owned().await else {
            self.skip("send pool released");
            return;
        };

        if self.state.is_failed() {
            self.skip("a previous send failed");
            return;
        }

        let events = self.buffer.len();
        match self.send().await {
            Ok(bytes) => {
                self.state.metrics.record_sent(events as u64, bytes as u64);
                tracing::debug!(
                    transport = self.factory.name(),
                    partition = %self.partition,
                    events,
                    bytes,
                    "buffer sent"
                );
            }
            Err(e) => {
                self.state.metrics.record_failed();
                self.state.record_failure(&e);
                tracing::error!(
                    transport = self.factory.name(),
                    partition = %self.partition,
                    events,
                    error = %e,
                    "send failed"
                );
            }
        }
        self.finished = true;
    }

    async fn send(&mut self) -> Result<usize, TransportError> {
        let mut transport = self.factory.new_instance()?;
        self.buffer.close();
        transport
            .send(self.buffer.as_ref(), &self.partition)
            .await?;
        Ok(self.buffer.contents().len())
    }

    fn skip(&mut self, reason: &'static str) {
        self.state.metrics.record_skipped();
        tracing::warn!(
            partition = %self.partition,
            events = self.buffer.len(),
            reason,
            "buffer discarded without sending"
        );
        self.finished = true;
    }
}

impl Drop for SendTask {
    fn drop(&mut self) {
        if !self.finished {
            self.state.metrics.record_failed();
            self.state.record_failure(&"send task aborted");
        }
        self.buffer.clear();
        self.state.end_send();
    }
}
