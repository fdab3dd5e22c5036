//! Conditional - route each event to the first branch whose condition holds
//!
//! Unlike [`Fork`](crate::Fork), events are not copied: each one goes to at
//! most one branch. Events matching no condition pass through unchanged, or
//! are dropped when `filter_non_match` is set.
//!
//! Branches run on their own tasks and share one output channel, exactly as
//! fork branches do. A condition error is fatal and is sent to the output.

use std::sync::Arc;

use futures_util::StreamExt;
use sluice_protocol::Event;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::stream::{self, ItemSender};
use crate::{Chain, EventStream, FilterOperation, TransformError, TransformResult};

#[cfg(test)]
#[path = "conditional_test.rs"]
mod tests;

/// One guarded branch
pub struct ConditionalBranch {
    condition: Arc<dyn FilterOperation>,
    chain: Chain,
}

impl ConditionalBranch {
    pub fn new(condition: Arc<dyn FilterOperation>, chain: Chain) -> Self {
        Self { condition, chain }
    }

    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name of the condition operation
    #[inline]
    pub fn condition_name(&self) -> &'static str {
        self.condition.name()
    }
}

/// First-match router over guarded branches
pub struct Conditional {
    branches: Vec<ConditionalBranch>,
    filter_non_match: bool,
    buffer_size: usize,
}

impl Conditional {
    pub fn new(branches: Vec<ConditionalBranch>, filter_non_match: bool, buffer_size: usize) -> Self {
        Self {
            branches,
            filter_non_match,
            buffer_size: buffer_size.max(1),
        }
    }

    #[inline]
    pub fn branches(&self) -> &[ConditionalBranch] {
        &self.branches
    }

    #[inline]
    pub fn filters_non_match(&self) -> bool {
        self.filter_non_match
    }

    /// Spawn the router and branch tasks and return the merged output
    ///
    /// Must be called from within a Tokio runtime.
    pub fn apply(&self, input: EventStream) -> EventStream {
        let (output_tx, output_rx) = mpsc::channel(self.buffer_size);
        let mut routes = Vec::with_capacity(self.branches.len());
        let mut tasks = Vec::with_capacity(self.branches.len() + 1);

        for branch in &self.branches {
            let (tx, rx) = mpsc::channel(self.buffer_size);
            routes.push((Arc::clone(&branch.condition), tx));

            let branch_output = branch.chain.apply(ReceiverStream::new(rx).boxed());
            tasks.push(tokio::spawn(stream::forward(branch_output, output_tx.clone())));
        }

        tasks.push(tokio::spawn(route(
            input,
            routes,
            output_tx,
            self.filter_non_match,
        )));

        stream::fan_in(output_rx, tasks, "conditional")
    }
}

impl std::fmt::Debug for Conditional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conditional")
            .field("branches", &self.branches.len())
            .field("filter_non_match", &self.filter_non_match)
            .finish()
    }
}

type Route = (Arc<dyn FilterOperation>, ItemSender);

async fn route(
    mut input: EventStream,
    routes: Vec<Route>,
    passthrough: ItemSender,
    filter_non_match: bool,
) {
    loop {
        let item = tokio::select! {
            _ = passthrough.closed() => return,
            item = input.next() => item,
        };
        let Some(item) = item else {
            return;
        };

        let (target, item) = match item {
            Err(e) => (&passthrough, Err(e)),
            Ok(event) => match select(&routes, &event) {
                Ok(Some(sender)) => (sender, Ok(event)),
                Ok(None) if filter_non_match => continue,
                Ok(None) => (&passthrough, Ok(event)),
                Err(e) => (&passthrough, Err(e)),
            },
        };

        if target.send(item).await.is_err() {
            return;
        }
    }
}

fn select<'a>(routes: &'a [Route], event: &Event) -> TransformResult<Option<&'a ItemSender>> {
    for (condition, sender) in routes {
        let matched = condition
            .test(event)
            .map_err(|e| TransformError::operation(condition.name(), e))?;
        if matched {
            return Ok(Some(sender));
        }
    }
    Ok(None)
}
