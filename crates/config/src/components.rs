//! Pluggable component configuration
//!
//! Operations, deserializers and serializers are all declared the same way:
//! a `type` tag that selects a registered factory plus free-form options
//! that the factory interprets.
//!
//! # Example
//!
//! ```toml
//! [[sources.operations]]
//! type = "filter"
//! field = "level"
//! pattern = "^debug$"
//!
//! [[sources.operations]]
//! type = "fork"
//! branches = [
//!     { operations = [{ type = "noop" }] },
//!     { operations = [{ type = "delete_field", field = "secret" }] },
//! ]
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Typed access to the free-form options of a component
pub trait ComponentOptions {
    /// Raw option table
    fn options(&self) -> &HashMap<String, toml::Value>;

    /// Get an option as string
    fn get_str(&self, key: &str) -> Option<&str> {
        self.options().get(key).and_then(|v| v.as_str())
    }

    /// Get an option as bool
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.options().get(key).and_then(|v| v.as_bool())
    }

    /// Get an option as i64
    fn get_int(&self, key: &str) -> Option<i64> {
        self.options().get(key).and_then(|v| v.as_integer())
    }

    /// Get an array option as Vec<String>
    fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.options().get(key).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }

    /// Decode a nested option into a typed structure
    ///
    /// Returns `None` if the key is absent.
    fn decode<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, toml::de::Error>> {
        self.options().get(key).map(|v| v.clone().try_into())
    }
}

/// Configuration for a single pluggable component instance
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentConfig {
    /// Component type (e.g., "noop", "json", "fork")
    #[serde(rename = "type")]
    pub component_type: String,

    /// Whether this component is enabled (default: true)
    ///
    /// Disabled operations are left out of their chain.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Type-specific configuration options
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

impl ComponentConfig {
    /// Create a config for the given type with no options
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            enabled: true,
            options: HashMap::new(),
        }
    }

    /// Add an option (builder style)
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Whether errors raised by this operation drop the event instead of
    /// aborting the invocation
    pub fn suppress_errors(&self) -> bool {
        self.get_bool("suppress_errors").unwrap_or(false)
    }
}

impl ComponentOptions for ComponentConfig {
    fn options(&self) -> &HashMap<String, toml::Value> {
        &self.options
    }
}

/// One branch of a `fork` or `conditional` operation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
    /// Routing condition (conditional branches only); must be a filter
    /// operation
    pub condition: Option<ComponentConfig>,

    /// Operations applied to events on this branch
    pub operations: Vec<ComponentConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_noop() {
        let config: ComponentConfig = toml::from_str(r#"type = "noop""#).unwrap();
        assert_eq!(config.component_type, "noop");
        assert!(config.enabled);
        assert!(config.options.is_empty());
        assert!(!config.suppress_errors());
    }

    #[test]
    fn test_deserialize_options() {
        let toml = r#"
type = "filter"
field = "level"
pattern = "^debug$"
match = false
suppress_errors = true
"#;
        let config: ComponentConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.get_str("field"), Some("level"));
        assert_eq!(config.get_str("pattern"), Some("^debug$"));
        assert_eq!(config.get_bool("match"), Some(false));
        assert!(config.suppress_errors());
    }

    #[test]
    fn test_deserialize_disabled() {
        let config: ComponentConfig = toml::from_str("type = \"noop\"\nenabled = false").unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_builder_options() {
        let config = ComponentConfig::new("set_field")
            .with_option("field", "env")
            .with_option("value", "prod");
        assert_eq!(config.get_str("field"), Some("env"));
        assert_eq!(config.get_str("value"), Some("prod"));
        assert_eq!(config.get_int("field"), None);
    }

    #[test]
    fn test_string_array() {
        let config: ComponentConfig =
            toml::from_str("type = \"x\"\nfields = [\"a\", \"b\", 3]").unwrap();
        assert_eq!(
            config.get_string_array("fields"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_decode_fork_branches() {
        let toml = r#"
type = "fork"
branches = [
    { operations = [{ type = "noop" }] },
    { operations = [{ type = "delete_field", field = "secret" }, { type = "noop" }] },
]
"#;
        let config: ComponentConfig = toml::from_str(toml).unwrap();
        let branches: Vec<BranchConfig> = config.decode("branches").unwrap().unwrap();

        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].operations[0].component_type, "noop");
        assert_eq!(branches[1].operations.len(), 2);
        assert_eq!(branches[1].operations[0].get_str("field"), Some("secret"));
        assert!(branches[0].condition.is_none());
    }

    #[test]
    fn test_decode_missing_key() {
        let config = ComponentConfig::new("fork");
        assert!(config.decode::<Vec<BranchConfig>>("branches").is_none());
    }
}
