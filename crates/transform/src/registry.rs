//! Operation Registry - Config-driven operation creation
//!
//! The registry maps operation type tags to factories. It is built once at
//! startup (see [`default_registry`]) and only read afterwards.
//!
//! # Design
//!
//! - **Static table**: tags resolve to factories, no reflection
//! - **Recursive**: `fork` and `conditional` factories build their branch
//!   chains through the same registry via [`ChainBuilder`]
//! - **Independent instances**: every branch gets its own processors, so
//!   counters are per (branch, operation)
//!
//! # Example
//!
//! ```ignore
//! let mut registry = default_registry();
//! registry.register("enrich", EnrichFactory);
//!
//! let chain = ChainBuilder::new(&registry, 1024).build(&source.operations)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use sluice_config::{BranchConfig, ComponentConfig, ComponentOptions};

use crate::fields::{DeleteFieldFactory, SetFieldFactory};
use crate::filter::{BasicFilterFactory, RegexFilterFactory};
use crate::noop::NoopFactory;
use crate::time::TimeFactory;
use crate::{
    Chain, Conditional, ConditionalBranch, FilterOperation, Fork, Operation, OperationProcessor,
    TransformError, TransformResult,
};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Factory trait for creating operations
///
/// Implement this trait to register custom operations with the registry.
pub trait OperationFactory: Send + Sync {
    /// Create an operation instance from configuration
    ///
    /// `builder` gives access to the registry for operations that contain
    /// nested chains.
    ///
    /// # Errors
    /// Returns `TransformError::Config` if configuration is invalid
    fn create(&self, config: &ComponentConfig, builder: &ChainBuilder<'_>) -> TransformResult<Operation>;

    /// Human-readable name for this factory (for error messages)
    fn name(&self) -> &'static str;
}

/// Registry for operation factories
pub struct OperationRegistry {
    factories: HashMap<String, Box<dyn OperationFactory>>,
}

impl OperationRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an operation factory
    ///
    /// # Panics
    /// Panics if a factory is already registered with this tag.
    /// Use `try_register` for fallible registration.
    pub fn register<F: OperationFactory + 'static>(&mut self, type_name: &str, factory: F) {
        if !self.try_register(type_name, factory) {
            panic!("operation factory '{type_name}' already registered");
        }
    }

    /// Try to register an operation factory
    ///
    /// Returns `false` if a factory is already registered with this tag.
    pub fn try_register<F: OperationFactory + 'static>(&mut self, type_name: &str, factory: F) -> bool {
        if self.factories.contains_key(type_name) {
            return false;
        }
        self.factories
            .insert(type_name.to_string(), Box::new(factory));
        true
    }

    /// Create an operation from its configuration
    ///
    /// # Errors
    /// - `TransformError::Config` if the type is not registered
    /// - Any error the factory returns
    pub fn create(&self, config: &ComponentConfig, builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        let factory = self.factories.get(&config.component_type).ok_or_else(|| {
            TransformError::config(format!(
                "unknown operation type '{}', available: [{}]",
                config.component_type,
                self.available_types().join(", ")
            ))
        })?;

        factory.create(config, builder).map_err(|e| match e {
            TransformError::Config(msg) => {
                TransformError::config(format!("{}: {msg}", factory.name()))
            }
            other => other,
        })
    }

    /// Check if an operation type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered operation types, sorted
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds chains of processors from operation configs
#[derive(Clone, Copy)]
pub struct ChainBuilder<'a> {
    registry: &'a OperationRegistry,
    fork_buffer_size: usize,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(registry: &'a OperationRegistry, fork_buffer_size: usize) -> Self {
        Self {
            registry,
            fork_buffer_size,
        }
    }

    #[inline]
    pub fn registry(&self) -> &'a OperationRegistry {
        self.registry
    }

    /// Capacity of each branch buffer for fork and conditional stages
    #[inline]
    pub fn fork_buffer_size(&self) -> usize {
        self.fork_buffer_size
    }

    /// Build one processor, honoring `suppress_errors`
    pub fn processor(&self, config: &ComponentConfig) -> TransformResult<OperationProcessor> {
        let operation = self.registry.create(config, self)?;
        Ok(OperationProcessor::new(operation).with_suppress_errors(config.suppress_errors()))
    }

    /// Build a chain, skipping disabled operations
    pub fn build(&self, configs: &[ComponentConfig]) -> TransformResult<Chain> {
        let processors = configs
            .iter()
            .filter(|c| c.enabled)
            .map(|c| self.processor(c))
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(Chain::new(processors))
    }

    /// Build a filter operation (used for conditional branch conditions)
    pub fn filter(&self, config: &ComponentConfig) -> TransformResult<Arc<dyn FilterOperation>> {
        match self.registry.create(config, self)? {
            Operation::Filter(op) => Ok(op),
            other => Err(TransformError::config(format!(
                "condition must be a filter operation, got '{}'",
                other.name()
            ))),
        }
    }
}

fn branches(config: &ComponentConfig) -> TransformResult<Vec<BranchConfig>> {
    config
        .decode::<Vec<BranchConfig>>("branches")
        .ok_or_else(|| TransformError::config("requires 'branches'"))?
        .map_err(|e| TransformError::config(format!("invalid 'branches': {e}")))
}

/// Factory for [`Fork`]
///
/// ```toml
/// type = "fork"
/// branches = [{ operations = [...] }, { operations = [...] }]
/// ```
pub struct ForkFactory;

impl OperationFactory for ForkFactory {
    fn create(&self, config: &ComponentConfig, builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        let branches = branches(config)?;
        if branches.is_empty() {
            return Err(TransformError::config("requires at least one branch"));
        }

        let chains = branches
            .iter()
            .map(|b| builder.build(&b.operations))
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Operation::Fork(Fork::new(chains, builder.fork_buffer_size())))
    }

    fn name(&self) -> &'static str {
        "fork"
    }
}

/// Factory for [`Conditional`]
///
/// ```toml
/// type = "conditional"
/// filter_non_match = false
/// branches = [{ condition = { type = "filter", ... }, operations = [...] }]
/// ```
pub struct ConditionalFactory;

impl OperationFactory for ConditionalFactory {
    fn create(&self, config: &ComponentConfig, builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        let branches = branches(config)?
            .iter()
            .map(|b| -> TransformResult<ConditionalBranch> {
                let condition = b
                    .condition
                    .as_ref()
                    .ok_or_else(|| TransformError::config("every branch requires a 'condition'"))?;
                Ok(ConditionalBranch::new(
                    builder.filter(condition)?,
                    builder.build(&b.operations)?,
                ))
            })
            .collect::<TransformResult<Vec<_>>>()?;

        let filter_non_match = config.get_bool("filter_non_match").unwrap_or(false);
        Ok(Operation::Conditional(Conditional::new(
            branches,
            filter_non_match,
            builder.fork_buffer_size(),
        )))
    }

    fn name(&self) -> &'static str {
        "conditional"
    }
}

/// Create a registry with all built-in operations registered
///
/// Includes:
/// - `noop` - Pass-through
/// - `filter` - Regex match on a payload field
/// - `basic_filter` - Constant keep/drop
/// - `delete_field` / `set_field` - Field edits
/// - `time` - Occurrence time from a payload field
/// - `fork` - Copy to every branch, merge outputs
/// - `conditional` - Route to the first matching branch
pub fn default_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry.register("noop", NoopFactory);
    registry.register("filter", RegexFilterFactory);
    registry.register("basic_filter", BasicFilterFactory);
    registry.register("delete_field", DeleteFieldFactory);
    registry.register("set_field", SetFieldFactory);
    registry.register("time", TimeFactory);
    registry.register("fork", ForkFactory);
    registry.register("conditional", ConditionalFactory);
    registry
}
