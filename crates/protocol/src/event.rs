//! Events and payloads
//!
//! An `Event` wraps one raw record with its timestamps, the deserialized
//! payload, the serialized output, the partition key and free-form
//! metadata. Events are owned values; fan-out stages take explicit copies
//! through [`Event::fork_copy`].

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::{PartitionKey, Record};

/// Deserialized event body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opaque text (no field access)
    Text(String),

    /// Structured JSON document
    Json(Value),
}

impl Payload {
    /// Text content, if this is a text payload
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Json(_) => None,
        }
    }

    /// JSON document, if this is a JSON payload
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    /// Look up a field by dotted path (`"a.b.c"`)
    ///
    /// Text payloads have no fields.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut current = self.as_json()?;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Field rendered as a string
    ///
    /// Strings are returned unquoted, `null` is treated as absent and any
    /// other value is rendered as compact JSON.
    pub fn field_string(&self, path: &str) -> Option<String> {
        match self.field(path)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a field by dotted path, creating intermediate objects
    ///
    /// Returns `false` if the payload is text or an intermediate value is
    /// not an object.
    pub fn set_field(&mut self, path: &str, value: Value) -> bool {
        let Self::Json(root) = self else {
            return false;
        };

        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return false;
        };

        let mut current = root;
        for segment in segments {
            let Some(object) = current.as_object_mut() else {
                return false;
            };
            current = object
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
        }

        match current.as_object_mut() {
            Some(object) => {
                object.insert(last.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Remove a field by dotted path, returning the removed value
    pub fn remove_field(&mut self, path: &str) -> Option<Value> {
        let Self::Json(root) = self else {
            return None;
        };

        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };

        let mut current = root;
        if let Some(parent) = parent {
            for segment in parent.split('.') {
                current = current.as_object_mut()?.get_mut(segment)?;
            }
        }

        current.as_object_mut()?.remove(last)
    }
}

/// The unit that flows through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    raw: String,
    arrival_time_ms: i64,
    occurrence_time_ms: Option<i64>,
    payload: Option<Payload>,
    serialized: Option<Bytes>,
    partition: PartitionKey,
    metadata: BTreeMap<String, String>,
}

impl Event {
    /// Create an event from raw text and its arrival time
    pub fn new(raw: impl Into<String>, arrival_time_ms: i64) -> Self {
        Self {
            raw: raw.into(),
            arrival_time_ms,
            occurrence_time_ms: None,
            payload: None,
            serialized: None,
            partition: PartitionKey::empty(),
            metadata: BTreeMap::new(),
        }
    }

    /// Create an event with an already-deserialized payload
    pub fn with_payload(raw: impl Into<String>, arrival_time_ms: i64, payload: Payload) -> Self {
        let mut event = Self::new(raw, arrival_time_ms);
        event.payload = Some(payload);
        event
    }

    /// Deep copy for fan-out
    ///
    /// The copy shares nothing with `self`; mutating one never affects the
    /// other.
    #[inline]
    pub fn fork_copy(&self) -> Self {
        self.clone()
    }

    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn arrival_time_ms(&self) -> i64 {
        self.arrival_time_ms
    }

    /// Time the event occurred, falling back to arrival time when unknown
    #[inline]
    pub fn occurrence_time_ms(&self) -> i64 {
        self.occurrence_time_ms.unwrap_or(self.arrival_time_ms)
    }

    /// Whether an explicit occurrence time has been set
    #[inline]
    pub fn has_occurrence_time(&self) -> bool {
        self.occurrence_time_ms.is_some()
    }

    pub fn set_occurrence_time_ms(&mut self, time_ms: i64) {
        self.occurrence_time_ms = Some(time_ms);
    }

    #[inline]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    #[inline]
    pub fn payload_mut(&mut self) -> Option<&mut Payload> {
        self.payload.as_mut()
    }

    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = Some(payload);
    }

    /// Serialized output, present once the serialize stage has run
    #[inline]
    pub fn serialized(&self) -> Option<&Bytes> {
        self.serialized.as_ref()
    }

    pub fn set_serialized(&mut self, bytes: Bytes) {
        self.serialized = Some(bytes);
    }

    #[inline]
    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    pub fn set_partition(&mut self, partition: PartitionKey) {
        self.partition = partition;
    }

    #[inline]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}

impl From<Record> for Event {
    fn from(record: Record) -> Self {
        Self::new(record.text, record.arrival_time_ms)
    }
}
