//! No-op operation
//!
//! Passes every event through unchanged. Useful as a placeholder branch and
//! in tests.

use sluice_config::ComponentConfig;
use sluice_protocol::Event;

use crate::registry::{ChainBuilder, OperationFactory};
use crate::{EventOperation, Operation, TransformResult};

#[cfg(test)]
#[path = "noop_test.rs"]
mod tests;

/// Identity operation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOperation;

impl NoopOperation {
    pub fn new() -> Self {
        Self
    }
}

impl EventOperation for NoopOperation {
    fn perform(&self, event: Event) -> TransformResult<Option<Event>> {
        Ok(Some(event))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Factory for [`NoopOperation`]
pub struct NoopFactory;

impl OperationFactory for NoopFactory {
    fn create(&self, _config: &ComponentConfig, _builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        Ok(Operation::event(NoopOperation))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
