//! Codecs - deserializers, wrappers and serializers
//!
//! A [`Deserializer`] turns a raw record into a [`Payload`]; a [`Wrapper`]
//! picks the envelope around the final payload; a [`Serializer`] turns
//! that into the bytes handed to a transport buffer.
//!
//! All three are selected by `type` tag through a [`CodecRegistry`], a
//! static table built once at startup.
//!
//! # Built-in codecs
//!
//! | Tag | Deserializer | Serializer |
//! |-----|--------------|------------|
//! | `text` | payload is the raw text | text as-is, JSON compact |
//! | `json` | parses JSON; `null` is a null result | compact JSON |
//!
//! Wrappers: `passthrough` (default) and `basic` (hash, times, metadata).

mod json;
mod text;
mod wrapper;

use std::collections::HashMap;

use bytes::Bytes;
use sluice_config::ComponentConfig;
use sluice_protocol::Payload;

use crate::{TransformError, TransformResult};

pub use json::{JsonDeserializer, JsonSerializer};
pub use text::{TextDeserializer, TextSerializer};
pub use wrapper::{BasicWrapper, PassthroughWrapper, Wrapper, sha1_hex};


/// Raw record → payload
pub trait Deserializer: Send + Sync {
    /// Deserialize one raw record
    ///
    /// `Ok(None)` is a null result: the record carries no event. Both a
    /// null result and an error drop the event.
    fn deserialize(&self, raw: &str) -> TransformResult<Option<Payload>>;

    fn name(&self) -> &'static str;
}

/// Payload → bytes
pub trait Serializer: Send + Sync {
    fn serialize(&self, payload: &Payload) -> TransformResult<Bytes>;

    fn name(&self) -> &'static str;
}

/// Constructor for a deserializer from its config
pub type DeserializerConstructor = fn(&ComponentConfig) -> TransformResult<Box<dyn Deserializer>>;

/// Constructor for a serializer from its config
pub type SerializerConstructor = fn(&ComponentConfig) -> TransformResult<Box<dyn Serializer>>;

/// Constructor for a wrapper from its config
pub type WrapperConstructor = fn(&ComponentConfig) -> TransformResult<Box<dyn Wrapper>>;

/// Tag → constructor tables for every codec kind
#[derive(Default)]
pub struct CodecRegistry {
    deserializers: HashMap<String, DeserializerConstructor>,
    wrappers: HashMap<String, WrapperConstructor>,
    serializers: HashMap<String, SerializerConstructor>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deserializer; returns `false` if the tag is taken
    pub fn register_deserializer(&mut self, tag: &str, ctor: DeserializerConstructor) -> bool {
        if self.deserializers.contains_key(tag) {
            return false;
        }
        self.deserializers.insert(tag.to_string(), ctor);
        true
    }

    /// Register a wrapper; returns `false` if the tag is taken
    pub fn register_wrapper(&mut self, tag: &str, ctor: WrapperConstructor) -> bool {
        if self.wrappers.contains_key(tag) {
            return false;
        }
        self.wrappers.insert(tag.to_string(), ctor);
        true
    }

    /// Register a serializer; returns `false` if the tag is taken
    pub fn register_serializer(&mut self, tag: &str, ctor: SerializerConstructor) -> bool {
        if self.serializers.contains_key(tag) {
            return false;
        }
        self.serializers.insert(tag.to_string(), ctor);
        true
    }

    /// Build the deserializer selected by `config.component_type`
    pub fn deserializer(&self, config: &ComponentConfig) -> TransformResult<Box<dyn Deserializer>> {
        let ctor = self
            .deserializers
            .get(&config.component_type)
            .ok_or_else(|| unknown("deserializer", &config.component_type, self.deserializers.keys()))?;
        ctor(config)
    }

    /// Build the wrapper selected by `config.component_type`
    pub fn wrapper(&self, config: &ComponentConfig) -> TransformResult<Box<dyn Wrapper>> {
        let ctor = self
            .wrappers
            .get(&config.component_type)
            .ok_or_else(|| unknown("wrapper", &config.component_type, self.wrappers.keys()))?;
        ctor(config)
    }

    /// Build the serializer selected by `config.component_type`
    pub fn serializer(&self, config: &ComponentConfig) -> TransformResult<Box<dyn Serializer>> {
        let ctor = self
            .serializers
            .get(&config.component_type)
            .ok_or_else(|| unknown("serializer", &config.component_type, self.serializers.keys()))?;
        ctor(config)
    }
}

fn unknown<'a>(
    kind: &str,
    tag: &str,
    available: impl Iterator<Item = &'a String>,
) -> TransformError {
    let mut available: Vec<&str> = available.map(String::as_str).collect();
    available.sort_unstable();
    TransformError::config(format!(
        "unknown {kind} type '{tag}', available: [{}]",
        available.join(", ")
    ))
}

/// Create a codec registry with all built-in codecs registered
pub fn default_codecs() -> CodecRegistry {
    let mut registry = CodecRegistry::new();
    registry.register_deserializer("text", text_deserializer);
    registry.register_deserializer("json", json_deserializer);
    registry.register_wrapper("passthrough", passthrough_wrapper);
    registry.register_wrapper("basic", basic_wrapper);
    registry.register_serializer("text", text_serializer);
    registry.register_serializer("json", json_serializer);
    registry
}

fn text_deserializer(_: &ComponentConfig) -> TransformResult<Box<dyn Deserializer>> {
    Ok(Box::new(TextDeserializer))
}

fn json_deserializer(config: &ComponentConfig) -> TransformResult<Box<dyn Deserializer>> {
    Ok(Box::new(JsonDeserializer::from_config(config)))
}

fn passthrough_wrapper(_: &ComponentConfig) -> TransformResult<Box<dyn Wrapper>> {
    Ok(Box::new(PassthroughWrapper))
}

fn basic_wrapper(_: &ComponentConfig) -> TransformResult<Box<dyn Wrapper>> {
    Ok(Box::new(BasicWrapper))
}

fn text_serializer(_: &ComponentConfig) -> TransformResult<Box<dyn Serializer>> {
    Ok(Box::new(TextSerializer))
}

fn json_serializer(_: &ComponentConfig) -> TransformResult<Box<dyn Serializer>> {
    Ok(Box::new(JsonSerializer))
}
