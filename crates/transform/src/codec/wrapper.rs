//! Wrappers - the envelope around a payload at serialization time
//!
//! A wrapper runs after the operation chain and decides what the serializer
//! sees. `passthrough` hands over the payload untouched; `basic` nests it
//! in an object carrying the raw record's SHA-1, the event times and the
//! invocation metadata.

use std::borrow::Cow;

use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use sluice_protocol::{Event, Payload};

use crate::{TransformError, TransformResult};

/// Event → payload handed to the serializer
pub trait Wrapper: Send + Sync {
    /// # Errors
    /// Returns `TransformError::Serialize` if the event cannot be wrapped
    fn wrap<'a>(&self, event: &'a Event) -> TransformResult<Cow<'a, Payload>>;

    fn name(&self) -> &'static str;
}

/// Serializes the payload as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughWrapper;

impl Wrapper for PassthroughWrapper {
    fn wrap<'a>(&self, event: &'a Event) -> TransformResult<Cow<'a, Payload>> {
        event
            .payload()
            .map(Cow::Borrowed)
            .ok_or_else(|| TransformError::serialize("event has no payload"))
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Wraps the payload with its hash, times and metadata
///
/// ```json
/// {"sha1_hash":"...","timestamp":1700000000000,"arrival_time":1700000000123,
///  "metadata":{"source":"app-2024"},"payload":{...}}
/// ```
///
/// `timestamp` is the occurrence time (arrival time when unset). Text
/// payloads become JSON strings; a missing payload is `null`. `metadata`
/// is omitted when the event has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicWrapper;

impl Wrapper for BasicWrapper {
    fn wrap<'a>(&self, event: &'a Event) -> TransformResult<Cow<'a, Payload>> {
        let payload = match event.payload() {
            Some(Payload::Json(value)) => value.clone(),
            Some(Payload::Text(text)) => Value::String(text.clone()),
            None => Value::Null,
        };

        let mut wrapped = Map::new();
        wrapped.insert("sha1_hash".into(), Value::String(sha1_hex(event.raw())));
        wrapped.insert("timestamp".into(), event.occurrence_time_ms().into());
        wrapped.insert("arrival_time".into(), event.arrival_time_ms().into());
        if !event.metadata().is_empty() {
            let metadata = event
                .metadata()
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            wrapped.insert("metadata".into(), Value::Object(metadata));
        }
        wrapped.insert("payload".into(), payload);

        Ok(Cow::Owned(Payload::Json(Value::Object(wrapped))))
    }

    fn name(&self) -> &'static str {
        "basic"
    }
}

/// Lowercase hex SHA-1 of the raw record text
pub fn sha1_hex(raw: &str) -> String {
    hex::encode(Sha1::digest(raw.as_bytes()))
}
