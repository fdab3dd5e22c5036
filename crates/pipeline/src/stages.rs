//! Per-event stages around the operation chain
//!
//! [`PreFilter`] runs on raw text, [`DeserializerProcessor`] turns it into a
//! payload and partition key, [`SerializerProcessor`] wraps the payload and
//! produces the bytes the dispatch buffers hold. All three are non-fatal: a dropped event is
//! counted and the stream continues.

use std::sync::Arc;

use regex::Regex;
use sluice_config::SourceConfig;
use sluice_protocol::Event;
use sluice_transform::codec::PassthroughWrapper;
use sluice_transform::{Deserializer, PartitionSpec, Serializer, Wrapper};

use crate::PipelineMetrics;

#[cfg(test)]
#[path = "stages_test.rs"]
mod tests;

/// Drops records whose raw text contains a configured substring or matches
/// a configured regex
///
/// Substrings are checked first, then regexes, both in configured order.
#[derive(Debug, Clone, Default)]
pub struct PreFilter {
    contains: Vec<String>,
    patterns: Vec<Regex>,
}

impl PreFilter {
    pub fn new(contains: Vec<String>, patterns: Vec<Regex>) -> Self {
        Self { contains, patterns }
    }

    /// Build from a source's `contains_strings` and `regex_patterns`
    ///
    /// # Errors
    /// Returns the first pattern that fails to compile
    pub fn from_config(config: &SourceConfig) -> Result<Self, regex::Error> {
        let patterns = config
            .regex_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(config.contains_strings.clone(), patterns))
    }

    /// Whether the raw text must be dropped
    pub fn matches(&self, raw: &str) -> bool {
        self.contains.iter().any(|s| raw.contains(s.as_str()))
            || self.patterns.iter().any(|re| re.is_match(raw))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contains.is_empty() && self.patterns.is_empty()
    }
}

/// Deserializes raw text and assigns the partition key
pub struct DeserializerProcessor {
    deserializer: Arc<dyn Deserializer>,
    partitions: Vec<PartitionSpec>,
}

impl DeserializerProcessor {
    pub fn new(deserializer: Arc<dyn Deserializer>, partitions: Vec<PartitionSpec>) -> Self {
        Self {
            deserializer,
            partitions,
        }
    }

    /// Deserialize one event; `None` means it was dropped and counted
    pub fn process(&self, mut event: Event, metrics: &PipelineMetrics) -> Option<Event> {
        match self.deserializer.deserialize(event.raw()) {
            Ok(Some(payload)) => {
                if !self.partitions.is_empty() {
                    event.set_partition(PartitionSpec::key(&self.partitions, Some(&payload)));
                }
                event.set_payload(payload);
                Some(event)
            }
            Ok(None) => {
                metrics.record_deserialize_error();
                tracing::warn!(
                    deserializer = self.deserializer.name(),
                    "deserializer returned no payload, dropping event"
                );
                None
            }
            Err(e) => {
                metrics.record_deserialize_error();
                tracing::warn!(
                    deserializer = self.deserializer.name(),
                    error = %e,
                    "deserialization failed, dropping event"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for DeserializerProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeserializerProcessor")
            .field("deserializer", &self.deserializer.name())
            .field("partitions", &self.partitions)
            .finish()
    }
}

/// Wraps and serializes the final payload into the event's wire form
pub struct SerializerProcessor {
    wrapper: Arc<dyn Wrapper>,
    serializer: Arc<dyn Serializer>,
}

impl SerializerProcessor {
    /// Serializer with the `passthrough` wrapper
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self {
            wrapper: Arc::new(PassthroughWrapper),
            serializer,
        }
    }

    pub fn with_wrapper(mut self, wrapper: Arc<dyn Wrapper>) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Serialize one event; `None` means it was dropped and counted
    ///
    /// A wrapper failure counts as a serialize error.
    pub fn process(&self, mut event: Event, metrics: &PipelineMetrics) -> Option<Event> {
        let result = self
            .wrapper
            .wrap(&event)
            .and_then(|payload| self.serializer.serialize(&payload));

        match result {
            Ok(bytes) => {
                event.set_serialized(bytes);
                Some(event)
            }
            Err(e) => {
                metrics.record_serialize_error();
                tracing::warn!(
                    wrapper = self.wrapper.name(),
                    serializer = self.serializer.name(),
                    error = %e,
                    "serialization failed, dropping event"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for SerializerProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerProcessor")
            .field("wrapper", &self.wrapper.name())
            .field("serializer", &self.serializer.name())
            .finish()
    }
}
