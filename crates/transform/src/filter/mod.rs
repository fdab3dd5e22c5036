//! Filter operations
//!
//! - `filter`: matches a regex against one payload field. With
//!   `exclude = true` (default) matching events are dropped; with
//!   `exclude = false` non-matching events are dropped. The regex must
//!   match the whole field value. A missing field never matches.
//! - `basic_filter`: keeps every event when `pass = true`, drops every
//!   event otherwise. Mostly used as a catch-all conditional branch.
//!
//! # Example
//!
//! ```toml
//! [[sources.operations]]
//! type = "filter"
//! field = "level"
//! pattern = "debug|trace"
//! ```

use regex::Regex;
use sluice_config::{ComponentConfig, ComponentOptions};
use sluice_protocol::Event;

use crate::registry::{ChainBuilder, OperationFactory};
use crate::{FilterOperation, Operation, TransformError, TransformResult};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Regex match against a payload field
#[derive(Debug, Clone)]
pub struct RegexFilter {
    field: String,
    pattern: Regex,
    exclude: bool,
}

impl RegexFilter {
    /// Create a filter; `pattern` must match the entire field value
    pub fn new(field: impl Into<String>, pattern: &str, exclude: bool) -> TransformResult<Self> {
        let anchored = format!("^(?:{pattern})$");
        let pattern = Regex::new(&anchored)
            .map_err(|e| TransformError::config(format!("invalid filter pattern: {e}")))?;
        Ok(Self {
            field: field.into(),
            pattern,
            exclude,
        })
    }

    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[inline]
    pub fn excludes(&self) -> bool {
        self.exclude
    }
}

impl FilterOperation for RegexFilter {
    fn test(&self, event: &Event) -> TransformResult<bool> {
        let Some(payload) = event.payload() else {
            return Ok(false);
        };

        let found = payload
            .field_string(&self.field)
            .is_some_and(|value| self.pattern.is_match(&value));

        Ok(self.exclude != found)
    }

    fn name(&self) -> &'static str {
        "filter"
    }
}

/// Constant predicate
#[derive(Debug, Clone, Copy)]
pub struct BasicFilter {
    pass: bool,
}

impl BasicFilter {
    pub fn new(pass: bool) -> Self {
        Self { pass }
    }
}

impl FilterOperation for BasicFilter {
    fn test(&self, _event: &Event) -> TransformResult<bool> {
        Ok(self.pass)
    }

    fn name(&self) -> &'static str {
        "basic_filter"
    }
}

/// Factory for [`RegexFilter`]
pub struct RegexFilterFactory;

impl OperationFactory for RegexFilterFactory {
    fn create(&self, config: &ComponentConfig, _builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        let field = config
            .get_str("field")
            .ok_or_else(|| TransformError::config("filter requires 'field'"))?;
        let pattern = config
            .get_str("pattern")
            .ok_or_else(|| TransformError::config("filter requires 'pattern'"))?;
        let exclude = config.get_bool("exclude").unwrap_or(true);

        Ok(Operation::filter(RegexFilter::new(field, pattern, exclude)?))
    }

    fn name(&self) -> &'static str {
        "filter"
    }
}

/// Factory for [`BasicFilter`]
pub struct BasicFilterFactory;

impl OperationFactory for BasicFilterFactory {
    fn create(&self, config: &ComponentConfig, _builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        Ok(Operation::filter(BasicFilter::new(
            config.get_bool("pass").unwrap_or(false),
        )))
    }

    fn name(&self) -> &'static str {
        "basic_filter"
    }
}
