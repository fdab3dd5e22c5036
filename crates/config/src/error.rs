//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// No sources declared
    #[error("no sources are configured - at least one [[sources]] entry is required")]
    NoSources,

    /// Two sources share a name
    #[error("source name '{name}' is declared more than once")]
    DuplicateSource { name: String },

    /// A component lacks a required field
    ///
    /// `component` is the section kind ("source", "transport", ...), `name`
    /// the configured name of that section.
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        component: &'static str,
        name: String,
        field: &'static str,
    },

    /// A field is present but unusable (zero limit, bad regex, ...)
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        component: &'static str,
        name: String,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn duplicate_source(name: impl Into<String>) -> Self {
        Self::DuplicateSource { name: name.into() }
    }

    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
