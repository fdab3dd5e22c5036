//! Time operation
//!
//! Sets an event's occurrence time from a payload field. The field is
//! required: a missing or unparsable value is an operation error.
//!
//! Supported `format` values:
//! - `seconds` (default): epoch seconds, fractional allowed
//! - `milliseconds`: epoch milliseconds
//! - `rfc3339`: e.g. `2024-01-01T12:00:00Z`
//! - anything else: a chrono strftime pattern, interpreted as UTC
//!
//! # Example
//!
//! ```toml
//! [[sources.operations]]
//! type = "time"
//! field = "ts"
//! format = "milliseconds"
//! ```

use chrono::{DateTime, NaiveDateTime};
use sluice_config::{ComponentConfig, ComponentOptions};
use sluice_protocol::Event;

use crate::registry::{ChainBuilder, OperationFactory};
use crate::{EventOperation, Operation, TransformError, TransformResult};

#[cfg(test)]
#[path = "time_test.rs"]
mod tests;

/// How the time field is encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFormat {
    Seconds,
    Milliseconds,
    Rfc3339,
    Pattern(String),
}

impl TimeFormat {
    pub fn parse(name: &str) -> Self {
        match name {
            "seconds" => Self::Seconds,
            "milliseconds" => Self::Milliseconds,
            "rfc3339" => Self::Rfc3339,
            other => Self::Pattern(other.to_string()),
        }
    }

    /// Convert a field value to epoch milliseconds
    pub fn to_millis(&self, value: &str) -> TransformResult<i64> {
        let invalid = |e: &dyn std::fmt::Display| {
            TransformError::failed(format!("invalid timestamp '{value}': {e}"))
        };

        match self {
            Self::Seconds => value
                .trim()
                .parse::<f64>()
                .map(|s| (s * 1000.0) as i64)
                .map_err(|e| invalid(&e)),
            Self::Milliseconds => value
                .trim()
                .parse::<f64>()
                .map(|ms| ms as i64)
                .map_err(|e| invalid(&e)),
            Self::Rfc3339 => DateTime::parse_from_rfc3339(value.trim())
                .map(|dt| dt.timestamp_millis())
                .map_err(|e| invalid(&e)),
            Self::Pattern(pattern) => NaiveDateTime::parse_from_str(value.trim(), pattern)
                .map(|dt| dt.and_utc().timestamp_millis())
                .map_err(|e| invalid(&e)),
        }
    }
}

/// Sets the occurrence time from a payload field
#[derive(Debug, Clone)]
pub struct TimeOperation {
    field: String,
    format: TimeFormat,
}

impl TimeOperation {
    pub fn new(field: impl Into<String>, format: TimeFormat) -> Self {
        Self {
            field: field.into(),
            format,
        }
    }
}

impl EventOperation for TimeOperation {
    fn perform(&self, mut event: Event) -> TransformResult<Option<Event>> {
        let value = event
            .payload()
            .and_then(|p| p.field_string(&self.field))
            .ok_or_else(|| TransformError::field_not_found(&self.field))?;

        let millis = self.format.to_millis(&value)?;
        event.set_occurrence_time_ms(millis);
        Ok(Some(event))
    }

    fn name(&self) -> &'static str {
        "time"
    }
}

/// Factory for [`TimeOperation`]
pub struct TimeFactory;

impl OperationFactory for TimeFactory {
    fn create(&self, config: &ComponentConfig, _builder: &ChainBuilder<'_>) -> TransformResult<Operation> {
        let field = config
            .get_str("field")
            .ok_or_else(|| TransformError::config("time requires 'field'"))?;
        let format = TimeFormat::parse(config.get_str("format").unwrap_or("seconds"));

        Ok(Operation::event(TimeOperation::new(field, format)))
    }

    fn name(&self) -> &'static str {
        "time"
    }
}
