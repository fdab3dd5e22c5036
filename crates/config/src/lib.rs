//! Sluice Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use sluice_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[[sources]]\nname = \"app\"").unwrap();
//! assert_eq!(config.sources.len(), 1);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [handler]
//! queue_size = 500
//!
//! [[sources]]
//! name = "app"
//! deserializer = { type = "json" }
//!
//! [wrapper]
//! type = "basic"
//!
//! [serializer]
//! type = "json"
//!
//! [transport]
//! type = "file"
//! path = "out/"
//! ```

mod components;
mod error;
mod handler;
mod logging;
mod sources;
mod transport;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use components::{BranchConfig, ComponentConfig, ComponentOptions};
pub use error::{ConfigError, Result};
pub use handler::{DEFAULT_FORK_BUFFER_SIZE, DEFAULT_QUEUE_SIZE, HandlerConfig};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use sources::{DEFAULT_SOURCE_REGEX, PartitionSpecConfig, SourceConfig};
pub use transport::{
    BufferConfig, Compression, DEFAULT_MAX_BYTES, DEFAULT_MAX_EVENTS, DEFAULT_THREADS,
    TransportConfig,
};

/// Main configuration structure
///
/// Every section except `[[sources]]` is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-invocation settings
    pub handler: HandlerConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Source definitions, matched in order against the invocation source
    pub sources: Vec<SourceConfig>,

    /// Envelope built around each payload before serialization
    /// (default: `passthrough`)
    pub wrapper: ComponentConfig,

    /// Serializer applied to every event before dispatch (default: `text`)
    pub serializer: ComponentConfig,

    /// Destination for serialized events (default: `stdout`)
    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            handler: HandlerConfig::default(),
            log: LogConfig::default(),
            sources: Vec::new(),
            wrapper: ComponentConfig::new("passthrough"),
            serializer: ComponentConfig::new("text"),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Run automatically by `from_str`/`from_file`; call it again after
    /// building or mutating a config in code.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Look up a source by name
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
