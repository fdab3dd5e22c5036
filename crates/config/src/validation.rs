//! Configuration validation
//!
//! Validates config consistency:
//! - At least one source, with unique names
//! - Source selection and pre-filter regexes compile
//! - Queue, buffer and pool sizes are positive
//! - Component declarations carry a type, including nested branches
//!
//! Whether a component type is actually registered is checked when the
//! handler is built, since embedders may register their own types.

use std::collections::HashSet;

use regex::Regex;

use crate::Config;
use crate::components::{BranchConfig, ComponentConfig, ComponentOptions};
use crate::error::{ConfigError, Result};
use crate::sources::SourceConfig;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_handler(config)?;
    validate_sources(config)?;
    validate_component("wrapper", "wrapper", &config.wrapper)?;
    validate_component("serializer", "serializer", &config.serializer)?;
    validate_transport(config)?;
    Ok(())
}

fn validate_handler(config: &Config) -> Result<()> {
    if config.handler.queue_size == 0 {
        return Err(ConfigError::invalid_value(
            "handler",
            "handler",
            "queue_size",
            "must be greater than 0",
        ));
    }
    if config.handler.fork_buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            "handler",
            "handler",
            "fork_buffer_size",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_sources(config: &Config) -> Result<()> {
    if config.sources.is_empty() {
        return Err(ConfigError::NoSources);
    }

    let mut names = HashSet::new();
    for source in &config.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::missing_field("source", "<unnamed>", "name"));
        }
        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::duplicate_source(&source.name));
        }
        validate_source(source)?;
    }

    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<()> {
    compile("source", &source.name, "source_regex", &source.source_regex)?;
    for pattern in &source.regex_patterns {
        compile("source", &source.name, "regex_patterns", pattern)?;
    }

    for partition in &source.partitions {
        if partition.name.trim().is_empty() {
            return Err(ConfigError::missing_field("source", &source.name, "partitions.name"));
        }
    }

    validate_component("source", &source.name, &source.deserializer)?;
    for operation in &source.operations {
        validate_operation(&source.name, operation)?;
    }

    Ok(())
}

/// Check an operation and, for branching operations, every nested branch
fn validate_operation(source: &str, operation: &ComponentConfig) -> Result<()> {
    validate_component("source", source, operation)?;

    let Some(branches) = operation.decode::<Vec<BranchConfig>>("branches") else {
        return Ok(());
    };
    let branches = branches.map_err(|e| {
        ConfigError::invalid_value("source", source, "branches", e.to_string())
    })?;

    for branch in &branches {
        if let Some(condition) = &branch.condition {
            validate_component("source", source, condition)?;
        }
        for nested in &branch.operations {
            validate_operation(source, nested)?;
        }
    }

    Ok(())
}

fn validate_component(
    component: &'static str,
    name: &str,
    config: &ComponentConfig,
) -> Result<()> {
    if config.component_type.trim().is_empty() {
        return Err(ConfigError::missing_field(component, name, "type"));
    }
    Ok(())
}

fn validate_transport(config: &Config) -> Result<()> {
    let transport = &config.transport;
    let name = transport.transport_type.as_str();

    if name.trim().is_empty() {
        return Err(ConfigError::missing_field("transport", "<unnamed>", "type"));
    }
    if transport.threads == 0 {
        return Err(ConfigError::invalid_value(
            "transport",
            name,
            "threads",
            "must be greater than 0",
        ));
    }
    if transport.buffer.max_events == 0 {
        return Err(ConfigError::invalid_value(
            "transport",
            name,
            "buffer.max_events",
            "must be greater than 0",
        ));
    }
    if transport.buffer.max_bytes == 0 {
        return Err(ConfigError::invalid_value(
            "transport",
            name,
            "buffer.max_bytes",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn compile(component: &'static str, name: &str, field: &'static str, pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid_value(component, name, field, e.to_string()))
}
