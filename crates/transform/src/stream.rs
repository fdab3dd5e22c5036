//! Event streams and the fan-in plumbing shared by branching stages

use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, future};
use sluice_protocol::Event;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::{TransformError, TransformResult};

/// Lazily evaluated stream of events flowing through the pipeline
///
/// An `Err` item is fatal: the consumer is expected to stop on the first
/// one, which in turn cancels any upstream branch tasks.
pub type EventStream = BoxStream<'static, TransformResult<Event>>;

/// Sender side of a branch channel
pub(crate) type ItemSender = mpsc::Sender<TransformResult<Event>>;

/// Build a stream over already-materialized events
pub fn from_events<I>(events: I) -> EventStream
where
    I: IntoIterator<Item = Event>,
    I::IntoIter: Send + 'static,
{
    stream::iter(events.into_iter().map(Ok)).boxed()
}

/// Drive one branch stream into the shared output channel
///
/// Stops as soon as the output side is gone, even while waiting for input,
/// so dropping the output unwinds every upstream stage.
pub(crate) async fn forward(mut branch: EventStream, output: ItemSender) {
    loop {
        let item = tokio::select! {
            _ = output.closed() => break,
            item = branch.next() => item,
        };
        let Some(item) = item else {
            break;
        };
        if output.send(item).await.is_err() {
            break;
        }
    }
}

/// Merge a shared output channel with the completion of its producer tasks
///
/// The stream ends once every sender is dropped; if any producer task ended
/// abnormally an error item is emitted last so the loss is never silent.
pub(crate) fn fan_in(
    output: mpsc::Receiver<TransformResult<Event>>,
    tasks: Vec<JoinHandle<()>>,
    stage: &'static str,
) -> EventStream {
    let completion = stream::once(async move {
        for task in tasks {
            if let Err(e) = task.await {
                return Some(Err(TransformError::Branch(format!("{stage}: {e}"))));
            }
        }
        None
    })
    .filter_map(future::ready);

    ReceiverStream::new(output).chain(completion).boxed()
}
