//! Pipeline - the staged stream of one source
//!
//! ```text
//! QueueStream --> [PreFilter] --> [Deserialize + partition] --> [Chain] --> [Wrap + Serialize] --> DispatchService::add
//! ```
//!
//! Stages compose lazily; nothing runs until [`Pipeline::run`] pulls. A
//! `Pipeline` holds no per-invocation state and is reused across
//! invocations; counters for one run live in a [`PipelineMetrics`].

use std::sync::Arc;

use futures_util::stream::Stream;
use futures_util::{StreamExt, future};
use sluice_protocol::Event;
use sluice_transform::{Chain, EventStream};

use crate::stages::{DeserializerProcessor, PreFilter, SerializerProcessor};
use crate::{DispatchService, IngestionQueue, PipelineError, PipelineMetrics, PipelineStats};

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;

/// Stages of one configured source
#[derive(Debug)]
pub struct Pipeline {
    prefilter: Arc<PreFilter>,
    deserializer: Arc<DeserializerProcessor>,
    chain: Chain,
    serializer: Arc<SerializerProcessor>,
}

impl Pipeline {
    pub fn new(
        prefilter: PreFilter,
        deserializer: DeserializerProcessor,
        chain: Chain,
        serializer: SerializerProcessor,
    ) -> Self {
        Self {
            prefilter: Arc::new(prefilter),
            deserializer: Arc::new(deserializer),
            chain,
            serializer: Arc::new(serializer),
        }
    }

    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Compose every stage over `input`
    ///
    /// Must be called from within a Tokio runtime when the chain contains a
    /// fork or conditional stage.
    pub fn stream<S>(&self, input: S, metrics: Arc<PipelineMetrics>) -> EventStream
    where
        S: Stream<Item = Event> + Send + 'static,
    {
        let prefilter = Arc::clone(&self.prefilter);
        let deserializer = Arc::clone(&self.deserializer);
        let serializer = Arc::clone(&self.serializer);
        let seen = Arc::clone(&metrics);

        let prepared = input
            .filter_map(move |event| {
                seen.record_seen();
                let out = if prefilter.matches(event.raw()) {
                    seen.record_filtered();
                    None
                } else {
                    deserializer.process(event, &seen).map(Ok)
                };
                future::ready(out)
            })
            .boxed();

        self.chain
            .apply(prepared)
            .filter_map(move |item| {
                let out = match item {
                    Ok(event) => serializer.process(event, &metrics).map(Ok),
                    Err(e) => Some(Err(e)),
                };
                future::ready(out)
            })
            .boxed()
    }

    /// Drain the queue through every stage into `dispatch`
    ///
    /// Returns this run's counters. Does not flush `dispatch`.
    ///
    /// # Errors
    /// - The first unsuppressed operation error
    /// - The first `DispatchService::add` error
    /// - A source read error reported by the feeder
    ///
    /// On a stage or dispatch error the feeder is abandoned rather than
    /// joined, so a source blocked in a read does not hold up the caller.
    pub async fn run(
        &self,
        queue: IngestionQueue,
        dispatch: &DispatchService,
    ) -> Result<PipelineStats, PipelineError> {
        let metrics = Arc::new(PipelineMetrics::new());
        self.run_with_metrics(queue, dispatch, Arc::clone(&metrics))
            .await?;
        Ok(metrics.snapshot())
    }

    /// Like [`run`](Self::run), recording into caller-owned metrics so the
    /// counters survive a failed run
    pub async fn run_with_metrics(
        &self,
        queue: IngestionQueue,
        dispatch: &DispatchService,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<(), PipelineError> {
        let (events, feeder) = queue.split();
        let mut stream = self.stream(events, Arc::clone(&metrics));

        let drained = drain(&mut stream, dispatch, &metrics).await;

        // Dropping the stream closes the queue and unwinds branch tasks, so
        // the feeder can stop even if it is parked on a full queue
        drop(stream);

        if let Err(e) = drained {
            feeder.abandon();
            return Err(e);
        }
        feeder.join().await?;
        Ok(())
    }
}

async fn drain(
    stream: &mut EventStream,
    dispatch: &DispatchService,
    metrics: &PipelineMetrics,
) -> Result<(), PipelineError> {
    while let Some(item) = stream.next().await {
        let event = item?;
        dispatch.add(&event)?;
        metrics.record_dispatched(&event);
    }
    Ok(())
}
