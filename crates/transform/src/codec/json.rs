//! JSON codec

use bytes::Bytes;
use serde_json::Value;
use sluice_config::{ComponentConfig, ComponentOptions};
use sluice_protocol::Payload;

use super::{Deserializer, Serializer};
use crate::{TransformError, TransformResult};

/// Parses each record as a JSON document
///
/// With `nested_field` set, the payload is re-rooted at that dotted path;
/// records lacking it yield a null result.
#[derive(Debug, Clone, Default)]
pub struct JsonDeserializer {
    nested_field: Option<String>,
}

impl JsonDeserializer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_nested_field(mut self, field: impl Into<String>) -> Self {
        self.nested_field = Some(field.into());
        self
    }

    pub fn from_config(config: &ComponentConfig) -> Self {
        Self {
            nested_field: config.get_str("nested_field").map(str::to_string),
        }
    }
}

impl Deserializer for JsonDeserializer {
    fn deserialize(&self, raw: &str) -> TransformResult<Option<Payload>> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| TransformError::deserialize(e.to_string()))?;

        let payload = Payload::Json(value);
        let payload = match &self.nested_field {
            None => payload,
            Some(field) => match payload.field(field) {
                Some(inner) => Payload::Json(inner.clone()),
                None => return Ok(None),
            },
        };

        match payload {
            Payload::Json(Value::Null) => Ok(None),
            other => Ok(Some(other)),
        }
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Writes payloads as compact JSON; text payloads become JSON strings
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, payload: &Payload) -> TransformResult<Bytes> {
        let bytes = match payload {
            Payload::Json(value) => serde_json::to_vec(value),
            Payload::Text(text) => serde_json::to_vec(text),
        }
        .map_err(|e| TransformError::serialize(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
