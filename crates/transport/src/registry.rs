//! Transport Registry - config-driven factory creation
//!
//! Maps the `[transport] type` tag to a constructor. Built once at startup
//! and only read afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use sluice_config::TransportConfig;

use crate::file::FileTransportFactory;
use crate::null::NullTransportFactory;
use crate::stdout::StdoutTransportFactory;
use crate::tcp::TcpTransportFactory;
use crate::{Result, TransportError, TransportFactory};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Builds a transport factory from its configuration
pub type TransportConstructor = fn(&TransportConfig) -> Result<Arc<dyn TransportFactory>>;

/// Registry of transport constructors
#[derive(Default)]
pub struct TransportRegistry {
    constructors: HashMap<String, TransportConstructor>,
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("types", &self.available_types())
            .finish()
    }
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor
    ///
    /// Returns `false` if the tag is already taken.
    pub fn register(&mut self, type_name: &str, constructor: TransportConstructor) -> bool {
        if self.constructors.contains_key(type_name) {
            return false;
        }
        self.constructors.insert(type_name.to_string(), constructor);
        true
    }

    /// Create the factory selected by `config.transport_type`
    ///
    /// # Errors
    /// - `TransportError::Config` if the type is not registered
    /// - Any error the constructor returns
    pub fn create(&self, config: &TransportConfig) -> Result<Arc<dyn TransportFactory>> {
        let constructor = self.constructors.get(&config.transport_type).ok_or_else(|| {
            TransportError::config(format!(
                "unknown transport type '{}', available: [{}]",
                config.transport_type,
                self.available_types().join(", ")
            ))
        })?;
        constructor(config)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Registered transport types, sorted
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }
}

/// Registry with `stdout`, `null`, `file` and `tcp`
pub fn default_transports() -> TransportRegistry {
    let mut registry = TransportRegistry::new();
    registry.register("stdout", StdoutTransportFactory::from_config);
    registry.register("null", NullTransportFactory::from_config);
    registry.register("file", FileTransportFactory::from_config);
    registry.register("tcp", TcpTransportFactory::from_config);
    registry
}
