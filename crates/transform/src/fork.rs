//! Fork - parallel fan-out of a stream into N branch chains
//!
//! Every input event is deep-copied once per branch; each branch runs its
//! own chain on its own task and all branch outputs are merged into a single
//! stream.
//!
//! # Design
//!
//! ```text
//!                 ┌─► [bounded chan] ─► branch task (Chain A) ─┐
//! input ─► distributor                                          ├─► [shared chan] ─► output
//!                 └─► [bounded chan] ─► branch task (Chain B) ─┘
//! ```
//!
//! - Branch channels are independent and bounded, so a slow branch only
//!   stalls the distributor once its own buffer is full
//! - Output order across branches is unspecified; order within a branch is
//!   preserved
//! - Upstream errors are forwarded exactly once, through the first branch
//! - The shared output closes when the last branch task drops its sender
//! - Dropping the output cancels everything upstream: branch tasks fail to
//!   forward and exit, their inputs close, and the distributor stops

use futures_util::{StreamExt, future};
use sluice_protocol::Event;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::stream::{self, ItemSender};
use crate::{Chain, EventStream};

#[cfg(test)]
#[path = "fork_test.rs"]
mod tests;

/// Fan-out stage over independent branch chains
#[derive(Debug)]
pub struct Fork {
    branches: Vec<Chain>,
    buffer_size: usize,
}

impl Fork {
    /// Create a fork; `buffer_size` bounds each branch input and the shared
    /// output channel
    pub fn new(branches: Vec<Chain>, buffer_size: usize) -> Self {
        Self {
            branches,
            buffer_size: buffer_size.max(1),
        }
    }

    #[inline]
    pub fn branches(&self) -> &[Chain] {
        &self.branches
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Spawn the distributor and branch tasks and return the merged output
    ///
    /// Must be called from within a Tokio runtime.
    pub fn apply(&self, input: EventStream) -> EventStream {
        if self.branches.is_empty() {
            // Nothing to fan out to: drain, keeping only errors
            return input
                .filter_map(|item| future::ready(item.err().map(Err)))
                .boxed();
        }

        let (output_tx, output_rx) = mpsc::channel(self.buffer_size);
        let mut senders = Vec::with_capacity(self.branches.len());
        let mut tasks = Vec::with_capacity(self.branches.len() + 1);

        for branch in &self.branches {
            let (tx, rx) = mpsc::channel(self.buffer_size);
            senders.push(tx);

            let branch_output = branch.apply(ReceiverStream::new(rx).boxed());
            tasks.push(tokio::spawn(stream::forward(branch_output, output_tx.clone())));
        }
        drop(output_tx);

        tasks.push(tokio::spawn(distribute(input, senders)));

        stream::fan_in(output_rx, tasks, "fork")
    }
}

/// Copy every input event into each branch, in input order
async fn distribute(mut input: EventStream, branches: Vec<ItemSender>) {
    let Some((last, rest)) = branches.split_last() else {
        return;
    };

    loop {
        // All branch receivers go away together on cancellation
        let item = tokio::select! {
            _ = last.closed() => return,
            item = input.next() => item,
        };
        let Some(item) = item else {
            return;
        };

        match item {
            Ok(event) => {
                if !send_copies(rest, last, event).await {
                    return;
                }
            }
            Err(e) => {
                let first = rest.first().unwrap_or(last);
                if first.send(Err(e)).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn send_copies(rest: &[ItemSender], last: &ItemSender, event: Event) -> bool {
    for branch in rest {
        if branch.send(Ok(event.fork_copy())).await.is_err() {
            return false;
        }
    }
    last.send(Ok(event)).await.is_ok()
}
