//! Source configuration
//!
//! A source describes how records from one family of triggering sources are
//! processed: which invocations it handles (`source_regex`), which raw
//! records are dropped up front, how records are deserialized and
//! partitioned, and the operations applied afterwards.
//!
//! # Example
//!
//! ```toml
//! [[sources]]
//! name = "app"
//! source_regex = "^app-.*"
//! contains_strings = ["healthcheck"]
//! regex_patterns = ["^DEBUG"]
//! deserializer = { type = "json" }
//! partitions = [{ name = "service", sources = ["service", "svc"], default = "none" }]
//!
//! [[sources.operations]]
//! type = "delete_field"
//! field = "password"
//! ```

use serde::Deserialize;

use crate::components::ComponentConfig;

/// Source matching every invocation
pub const DEFAULT_SOURCE_REGEX: &str = ".*";

/// One partition dimension
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartitionSpecConfig {
    /// Partition name (e.g., "service")
    pub name: String,

    /// Payload fields (dotted paths) tried in order; the first present one
    /// wins
    #[serde(default)]
    pub sources: Vec<String>,

    /// Value used when no source field is present
    pub default: Option<String>,
}

/// Processing definition for one family of sources
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    /// Unique source name
    pub name: String,

    /// Regex matched against the invocation's source identifier
    #[serde(default = "default_source_regex")]
    pub source_regex: String,

    /// Raw records containing any of these substrings are dropped
    #[serde(default)]
    pub contains_strings: Vec<String>,

    /// Raw records matching any of these regexes are dropped
    #[serde(default)]
    pub regex_patterns: Vec<String>,

    /// Deserializer for raw records (default: `text`)
    #[serde(default = "default_deserializer")]
    pub deserializer: ComponentConfig,

    /// Partition dimensions, in key order
    #[serde(default)]
    pub partitions: Vec<PartitionSpecConfig>,

    /// Operations applied after deserialization, in order
    #[serde(default)]
    pub operations: Vec<ComponentConfig>,
}

fn default_source_regex() -> String {
    DEFAULT_SOURCE_REGEX.to_string()
}

fn default_deserializer() -> ComponentConfig {
    ComponentConfig::new("text")
}

impl SourceConfig {
    /// Create a source that matches everything and passes text through
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_regex: default_source_regex(),
            contains_strings: Vec::new(),
            regex_patterns: Vec::new(),
            deserializer: default_deserializer(),
            partitions: Vec::new(),
            operations: Vec::new(),
        }
    }
}
