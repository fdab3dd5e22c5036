//! Transport configuration
//!
//! Exactly one transport is configured per handler. Every buffer built for
//! it shares the `[transport.buffer]` limits.
//!
//! # Example
//!
//! ```toml
//! [transport]
//! type = "file"
//! threads = 5
//! path = "out/"
//!
//! [transport.buffer]
//! max_events = 500
//! max_bytes = 5242880
//! compression = "lz4"
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::components::ComponentOptions;

/// Default number of concurrent sends
pub const DEFAULT_THREADS: usize = 5;

/// Default maximum events per buffer
pub const DEFAULT_MAX_EVENTS: usize = 500;

/// Default maximum encoded bytes per buffer (5 MiB)
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Buffer compression, applied when a buffer is closed
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

/// Limits shared by every buffer of the transport
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Events accepted before the buffer reports full
    pub max_events: usize,

    /// Encoded bytes accepted before the buffer reports full
    pub max_bytes: usize,

    pub compression: Compression,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            max_bytes: DEFAULT_MAX_BYTES,
            compression: Compression::None,
        }
    }
}

/// Transport selection and options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport type (e.g., "stdout", "file", "tcp")
    #[serde(rename = "type")]
    pub transport_type: String,

    /// Maximum concurrent sends
    pub threads: usize,

    pub buffer: BufferConfig,

    /// Type-specific options
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            transport_type: "stdout".to_string(),
            threads: DEFAULT_THREADS,
            buffer: BufferConfig::default(),
            options: HashMap::new(),
        }
    }
}

impl TransportConfig {
    /// Create a config for the given transport type with default limits
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: transport_type.into(),
            ..Self::default()
        }
    }

    /// Add an option (builder style)
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

impl ComponentOptions for TransportConfig {
    fn options(&self) -> &HashMap<String, toml::Value> {
        &self.options
    }
}
