//! Text codec - the raw record is the payload

use bytes::Bytes;
use sluice_protocol::Payload;

use super::{Deserializer, Serializer};
use crate::TransformResult;

/// Wraps the raw record text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDeserializer;

impl Deserializer for TextDeserializer {
    fn deserialize(&self, raw: &str) -> TransformResult<Option<Payload>> {
        Ok(Some(Payload::Text(raw.to_string())))
    }

    fn name(&self) -> &'static str {
        "text"
    }
}

/// Writes text payloads verbatim and JSON payloads as compact JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSerializer;

impl Serializer for TextSerializer {
    fn serialize(&self, payload: &Payload) -> TransformResult<Bytes> {
        Ok(match payload {
            Payload::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            Payload::Json(value) => Bytes::from(value.to_string()),
        })
    }

    fn name(&self) -> &'static str {
        "text"
    }
}
