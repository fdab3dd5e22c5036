//! Invocation handler configuration

use serde::Deserialize;

/// Default ingestion queue capacity
pub const DEFAULT_QUEUE_SIZE: usize = 500;

/// Default per-branch buffer capacity for fork and conditional operations
pub const DEFAULT_FORK_BUFFER_SIZE: usize = 1024;

/// Per-invocation settings
///
/// # Example
///
/// ```toml
/// [handler]
/// queue_size = 500
/// fail_on_exception = true
/// fork_buffer_size = 1024
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Capacity of the bounded ingestion queue between the source feeder and
    /// the pipeline
    pub queue_size: usize,

    /// Re-raise invocation failures to the caller (otherwise they are
    /// logged and swallowed)
    pub fail_on_exception: bool,

    /// Capacity of each fork branch input buffer
    pub fork_buffer_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            fail_on_exception: true,
            fork_buffer_size: DEFAULT_FORK_BUFFER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: HandlerConfig = toml::from_str("").unwrap();
        assert_eq!(config, HandlerConfig::default());
        assert_eq!(config.queue_size, 500);
        assert!(config.fail_on_exception);
    }

    #[test]
    fn test_overrides() {
        let config: HandlerConfig =
            toml::from_str("queue_size = 10\nfail_on_exception = false").unwrap();
        assert_eq!(config.queue_size, 10);
        assert!(!config.fail_on_exception);
        assert_eq!(config.fork_buffer_size, DEFAULT_FORK_BUFFER_SIZE);
    }
}
