//! Field operations
//!
//! - `delete_field`: removes one (`field`) or several (`fields`) dotted
//!   paths from JSON payloads; absent fields are ignored
//! - `set_field`: sets a dotted path to a static value, creating
//!   intermediate objects as needed
//!
//! # Example
//!
//! ```toml
//! [[sources.operations]]
//! type = "delete_field"
//! fields = ["password", "user.token"]
//!
//! [[sources.operations]]
//! type = "set_field"
//! field = "env"
//! value = "prod"
//! ```

use serde_json::Value;
use sluice_config::{ComponentConfig, ComponentOptions};
use sluice_protocol::Event;

use crate::registry::{ChainBuilder, OperationFactory};
use crate::{EventOperation, Operation, TransformError, TransformResult};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Removes fields from JSON payloads
#[derive(Debug, Clone)]
pub struct DeleteField {
    fields: Vec<String>,
}

impl DeleteField {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl EventOperation for DeleteField {
    fn perform(&self, mut event: Event) -> TransformResult<Option<Event>> {
        if let Some(payload) = event.payload_mut() {
            for field in &self.fields {
                payload.remove_field(field);
            }
        }
        Ok(Some(event))
    }

    fn name(&self) -> &'static str {
        "delete_field"
    }
}

/// Sets a field of a JSON payload to a static value
#[derive(Debug, Clone)]
pub struct SetField {
    field: String,
    value: Value,
}

impl SetField {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

impl EventOperation for SetField {
    fn perform(&self, mut event: Event) -> TransformResult<Option<Event>> {
        let payload = event
            .payload_mut()
            .ok_or_else(|| TransformError::failed("event has no payload"))?;

        if !payload.set_field(&self.field, self.value.clone()) {
            return Err(TransformError::failed(format!(
                "cannot set '{}' on this payload",
                self.field
            )));
        }
        Ok(Some(event))
    }

    fn name(&self) -> &'static str {
        "set_field"
    }
}

/// Factory for [`DeleteField`]
pub struct DeleteFieldFactory;

impl OperationFactory for DeleteFieldFactory {
    fn create(&self, config: &ComponentConfig, _builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        let mut fields = config.get_string_array("fields").unwrap_or_default();
        if let Some(field) = config.get_str("field") {
            fields.push(field.to_string());
        }
        if fields.is_empty() {
            return Err(TransformError::config(
                "delete_field requires 'field' or 'fields'",
            ));
        }
        Ok(Operation::event(DeleteField::new(fields)))
    }

    fn name(&self) -> &'static str {
        "delete_field"
    }
}

/// Factory for [`SetField`]
pub struct SetFieldFactory;

impl OperationFactory for SetFieldFactory {
    fn create(&self, config: &ComponentConfig, _builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        let field = config
            .get_str("field")
            .ok_or_else(|| TransformError::config("set_field requires 'field'"))?;
        let value = config
            .options
            .get("value")
            .ok_or_else(|| TransformError::config("set_field requires 'value'"))?;
        let value = serde_json::to_value(value)
            .map_err(|e| TransformError::config(format!("set_field value: {e}")))?;

        Ok(Operation::event(SetField::new(field, value)))
    }

    fn name(&self) -> &'static str {
        "set_field"
    }
}
