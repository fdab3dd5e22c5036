//! Partition specs
//!
//! Computes an event's [`PartitionKey`] from its payload after
//! deserialization. Each spec contributes one `(name, value)` pair, in spec
//! order.

use sluice_config::PartitionSpecConfig;
use sluice_protocol::{PartitionKey, Payload};

/// Value used when neither a source field nor a default is available
pub const UNKNOWN_PARTITION: &str = "unknown";

/// One partition dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    name: String,
    sources: Vec<String>,
    default: Option<String>,
}

impl PartitionSpec {
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value for this dimension: first present source field, else the
    /// default, else [`UNKNOWN_PARTITION`]
    pub fn value(&self, payload: Option<&Payload>) -> String {
        payload
            .and_then(|p| self.sources.iter().find_map(|field| p.field_string(field)))
            .or_else(|| self.default.clone())
            .unwrap_or_else(|| UNKNOWN_PARTITION.to_string())
    }

    /// Compute the full key for a payload
    pub fn key(specs: &[PartitionSpec], payload: Option<&Payload>) -> PartitionKey {
        specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.value(payload)))
            .collect()
    }
}

impl From<&PartitionSpecConfig> for PartitionSpec {
    fn from(config: &PartitionSpecConfig) -> Self {
        Self {
            name: config.name.clone(),
            sources: config.sources.clone(),
            default: config.default.clone(),
        }
    }
}
